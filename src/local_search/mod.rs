//! Local search operators and the shared improvement loop.
//!
//! - [`RelocateOperator`] — move one node to any other position
//! - [`SegmentMoveOperator`] — move a short segment, optionally inverted
//! - [`ThreePointOperator`] — two-cut relocation on the giant route
//!
//! Every operator enumerates [`Candidate`]s carrying an O(1) distance-delta
//! estimate; the loop applies a candidate, re-verifies with the full
//! evaluator (the static delta ignores penalties), and either commits or
//! reverses the move exactly.

mod relocate;
mod segment_move;
mod three_point;

use std::time::Instant;

use crate::error::SolverError;
use crate::evaluation::EvaluationService;
use crate::models::{Model, Quality, Solution};

pub use relocate::RelocateOperator;
pub use segment_move::SegmentMoveOperator;
pub use three_point::ThreePointOperator;

/// Minimum estimated gain for a candidate to be tried. Suppresses
/// float-noise thrashing.
pub const GAIN_EPSILON: f64 = 0.001;

/// A structural mutation of a solution. The closed set of move shapes all
/// operators produce.
///
/// For same-route moves, `to_pos` is interpreted on the route *after* the
/// source has been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveKind {
    /// Move one node to another position (possibly in another route).
    Relocate {
        /// Source route index.
        from_route: usize,
        /// Source position within the route.
        from_pos: usize,
        /// Destination route index.
        to_route: usize,
        /// Destination position (post-removal for same-route moves).
        to_pos: usize,
    },
    /// Move a contiguous segment, optionally inverting it.
    Segment {
        /// Source route index.
        from_route: usize,
        /// First position of the segment.
        from_pos: usize,
        /// Segment length.
        len: usize,
        /// Destination route index.
        to_route: usize,
        /// Destination position (post-removal for same-route moves).
        to_pos: usize,
        /// Whether the segment is reinserted in reverse order.
        invert: bool,
    },
}

impl MoveKind {
    /// Applies this move to the solution.
    pub fn apply(&self, solution: &mut Solution) {
        match *self {
            MoveKind::Relocate { from_route, from_pos, to_route, to_pos } => {
                let id = solution.remove_at(from_route, from_pos);
                solution.insert_at(to_route, to_pos, id);
            }
            MoveKind::Segment { from_route, from_pos, len, to_route, to_pos, invert } => {
                let mut segment = solution.splice_out(from_route, from_pos, len);
                if invert {
                    segment.reverse();
                }
                solution.splice_in(to_route, to_pos, &segment);
            }
        }
    }

    /// Undoes this move: the exact structural inverse of [`apply`].
    /// Restores the prior route contents byte-for-byte.
    ///
    /// [`apply`]: MoveKind::apply
    pub fn reverse(&self, solution: &mut Solution) {
        match *self {
            MoveKind::Relocate { from_route, from_pos, to_route, to_pos } => {
                let id = solution.remove_at(to_route, to_pos);
                solution.insert_at(from_route, from_pos, id);
            }
            MoveKind::Segment { from_route, from_pos, len, to_route, to_pos, invert } => {
                let mut segment = solution.splice_out(to_route, to_pos, len);
                if invert {
                    segment.reverse();
                }
                solution.splice_in(from_route, from_pos, &segment);
            }
        }
    }

    /// The routes whose contents this move changes.
    pub fn touched(&self) -> Vec<usize> {
        let (a, b) = match *self {
            MoveKind::Relocate { from_route, to_route, .. } => (from_route, to_route),
            MoveKind::Segment { from_route, to_route, .. } => (from_route, to_route),
        };
        if a == b {
            vec![a]
        } else {
            vec![a, b]
        }
    }
}

/// A candidate move with its estimated distance gain (positive = shorter).
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The structural mutation to perform.
    pub kind: MoveKind,
    /// Estimated distance saved; ignores penalties.
    pub gain: f64,
}

/// Result of an operator's neighborhood enumeration.
pub enum SearchOutcome {
    /// Valid candidates, unranked.
    Candidates(Vec<Candidate>),
    /// The operator does not apply to this solution/model combination.
    Unsupported(&'static str),
}

/// A local search neighborhood: enumerates candidate moves over a solution.
pub trait Operator {
    /// Operator name, for status reporting.
    fn name(&self) -> &'static str;

    /// Enumerates valid candidate moves with estimated gains.
    fn search(&self, solution: &Solution, model: &Model) -> SearchOutcome;
}

/// Outcome of running one operator to convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImproveResult {
    /// At least one move was committed.
    Improved,
    /// No candidate passed full evaluation.
    Exhausted,
    /// The operator does not support this solution/model combination.
    Unsupported(&'static str),
}

/// Runs one operator until no candidate improves the solution, the
/// deadline passes, or the operator reports itself unsupported.
///
/// Every committed move has `penalty == 0` and strictly lower fitness than
/// the best quality before the move.
pub fn improve_to_convergence(
    operator: &dyn Operator,
    solution: &mut Solution,
    model: &Model,
    evaluator: &EvaluationService<'_>,
    deadline: Option<Instant>,
) -> Result<ImproveResult, SolverError> {
    let mut improved_any = false;

    'outer: loop {
        if deadline_passed(deadline) {
            break;
        }
        let best = evaluator.check_and_fixate(solution)?;

        let mut candidates = match operator.search(solution, model) {
            SearchOutcome::Candidates(c) => c,
            SearchOutcome::Unsupported(reason) => {
                return Ok(if improved_any {
                    ImproveResult::Improved
                } else {
                    ImproveResult::Unsupported(reason)
                });
            }
        };
        candidates.retain(|c| c.gain > GAIN_EPSILON);
        candidates.sort_by(|a, b| b.gain.total_cmp(&a.gain));

        for candidate in &candidates {
            if deadline_passed(deadline) {
                break 'outer;
            }
            let touched = candidate.kind.touched();
            let saved: Vec<(usize, Option<Quality>)> = touched
                .iter()
                .map(|&r| (r, solution.route_quality(r).cloned()))
                .collect();

            candidate.kind.apply(solution);
            let result = evaluator.check_routes(solution, &touched)?;
            if result.is_feasible() && result.fitness() < best.fitness() {
                improved_any = true;
                continue 'outer;
            }

            candidate.kind.reverse(solution);
            for (r, quality) in saved {
                if let Some(q) = quality {
                    solution.set_route_quality(r, q);
                }
            }
        }
        break;
    }

    Ok(if improved_any {
        ImproveResult::Improved
    } else {
        ImproveResult::Exhausted
    })
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
