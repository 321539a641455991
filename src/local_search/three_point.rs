//! Three-point move: single-node relocation over the flattened giant route.

use crate::local_search::{Candidate, MoveKind, Operator, SearchOutcome};
use crate::models::{Model, Solution};

/// Relocates one node across the giant-route view: all routes concatenated
/// into one depot-delimited array, every (source, destination) index pair
/// enumerated, and each accepted pair decoded back to a per-route
/// [`MoveKind::Relocate`].
///
/// Only meaningful when all depot delimiters are the same node, so a model
/// with more than one depot is reported as unsupported rather than searched
/// incorrectly.
pub struct ThreePointOperator;

impl Operator for ThreePointOperator {
    fn name(&self) -> &'static str {
        "three-point"
    }

    fn search(&self, solution: &Solution, model: &Model) -> SearchOutcome {
        if model.depots().len() > 1 {
            return SearchOutcome::Unsupported("giant-route moves require a single depot");
        }

        let giant = solution.giant_route();
        let mut candidates = Vec::new();

        for i in 1..giant.len().saturating_sub(1) {
            let node = giant[i];
            if solution.is_depot(node) {
                continue;
            }
            let removal_gain = model.distance(giant[i - 1], node)
                + model.distance(node, giant[i + 1])
                - model.distance(giant[i - 1], giant[i + 1]);

            for j in 1..giant.len() {
                if j == i || j == i + 1 {
                    continue;
                }
                let insertion_cost = model.distance(giant[j - 1], node)
                    + model.distance(node, giant[j])
                    - model.distance(giant[j - 1], giant[j]);
                let gain = removal_gain - insertion_cost;

                let Some(kind) = decode(solution, i, j) else {
                    continue;
                };
                candidates.push(Candidate { kind, gain });
            }
        }

        SearchOutcome::Candidates(candidates)
    }
}

/// Decodes a giant-route (source, destination) index pair into a per-route
/// relocate move.
///
/// Destinations at a route's opening depot are rejected: the giant edge
/// there is the depot-to-depot seam between two routes, and no real
/// insertion matches its delta. Tails and heads are still reachable via the
/// closing depot and the first customer respectively.
fn decode(solution: &Solution, i: usize, j: usize) -> Option<MoveKind> {
    let (from_route, from_pos) = solution.locate_giant(i)?;
    let (to_route, mut to_pos) = solution.locate_giant(j)?;
    if to_pos == 0 {
        return None;
    }
    if to_route == from_route {
        if to_pos == from_pos || to_pos == from_pos + 1 {
            return None;
        }
        if to_pos > from_pos {
            to_pos -= 1;
        }
    }
    Some(MoveKind::Relocate { from_route, from_pos, to_route, to_pos })
}
