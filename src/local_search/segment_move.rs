//! Segment move: relocate a short run of nodes, optionally inverted.

use crate::local_search::{Candidate, MoveKind, Operator, SearchOutcome};
use crate::models::{Model, Solution};

/// Longest segment the operator relocates.
const MAX_SEGMENT_LEN: usize = 3;

/// Moves a contiguous run of up to three customers to another position, in
/// original or inverted order.
///
/// Destinations inside or adjacent to the source range are excluded; they
/// either reproduce the input or tear the segment.
pub struct SegmentMoveOperator;

impl Operator for SegmentMoveOperator {
    fn name(&self) -> &'static str {
        "segment-move"
    }

    fn search(&self, solution: &Solution, model: &Model) -> SearchOutcome {
        let mut candidates = Vec::new();

        for (from_route, route) in solution.routes().iter().enumerate() {
            if route.len() < 3 {
                continue;
            }
            for len in 1..=MAX_SEGMENT_LEN {
                if route.len() < len + 2 {
                    break;
                }
                for from_pos in 1..route.len() - len {
                    let segment = &route[from_pos..from_pos + len];
                    if segment.iter().any(|&id| solution.is_depot(id)) {
                        continue;
                    }
                    let prev = route[from_pos - 1];
                    let next = route[from_pos + len];
                    let first = segment[0];
                    let last = segment[len - 1];
                    let removal_gain = model.distance(prev, first) + model.distance(last, next)
                        - model.distance(prev, next);

                    for (to_route, dest) in solution.routes().iter().enumerate() {
                        for pos in 1..dest.len() {
                            if to_route == from_route
                                && (from_pos..=from_pos + len).contains(&pos)
                            {
                                continue;
                            }
                            let (before, after, to_pos) = if to_route == from_route {
                                let adjusted = if pos > from_pos { pos - len } else { pos };
                                let skip =
                                    |i: usize| if i >= from_pos { i + len } else { i };
                                (route[skip(adjusted - 1)], route[skip(adjusted)], adjusted)
                            } else {
                                (dest[pos - 1], dest[pos], pos)
                            };

                            for invert in [false, true] {
                                if invert && len == 1 {
                                    continue;
                                }
                                let (head, tail) =
                                    if invert { (last, first) } else { (first, last) };
                                let insertion_cost = model.distance(before, head)
                                    + model.distance(tail, after)
                                    - model.distance(before, after);
                                candidates.push(Candidate {
                                    kind: MoveKind::Segment {
                                        from_route,
                                        from_pos,
                                        len,
                                        to_route,
                                        to_pos,
                                        invert,
                                    },
                                    gain: removal_gain - insertion_cost,
                                });
                            }
                        }
                    }
                }
            }
        }

        SearchOutcome::Candidates(candidates)
    }
}
