//! Relocate: move a single node to another position.

use crate::local_search::{Candidate, MoveKind, Operator, SearchOutcome};
use crate::models::{Model, Solution};

/// Moves one customer node to any other position in any route.
///
/// The gain estimate is the exact distance delta: three removed edges minus
/// three added edges (degenerating to four distinct terms when the source
/// and destination are adjacent).
///
/// # Examples
///
/// ```
/// use fleet_routing::local_search::{Operator, RelocateOperator, SearchOutcome};
/// use fleet_routing::models::{Model, Node, Solution, Vehicle};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::customer(1, 1.0, 0.0, vec![1.0], 0.0),
///     Node::customer(2, 2.0, 0.0, vec![1.0], 0.0),
/// ];
/// let model = Model::builder(nodes, Vehicle::new(0, vec![10.0])).build().unwrap();
/// let mut sol = model.empty_solution();
/// sol.add_route(vec![0, 2, 0]).unwrap();
/// sol.add_route(vec![0, 1, 0]).unwrap();
///
/// match RelocateOperator.search(&sol, &model) {
///     SearchOutcome::Candidates(c) => assert!(!c.is_empty()),
///     SearchOutcome::Unsupported(_) => unreachable!(),
/// }
/// ```
pub struct RelocateOperator;

impl Operator for RelocateOperator {
    fn name(&self) -> &'static str {
        "relocate"
    }

    fn search(&self, solution: &Solution, model: &Model) -> SearchOutcome {
        let mut candidates = Vec::new();

        for (from_route, route) in solution.routes().iter().enumerate() {
            if route.len() < 3 {
                continue;
            }
            for from_pos in 1..route.len() - 1 {
                let node = route[from_pos];
                if solution.is_depot(node) {
                    continue;
                }
                let prev = route[from_pos - 1];
                let next = route[from_pos + 1];
                let removal_gain = model.distance(prev, node) + model.distance(node, next)
                    - model.distance(prev, next);

                for (to_route, dest) in solution.routes().iter().enumerate() {
                    for pos in 1..dest.len() {
                        if to_route == from_route && (pos == from_pos || pos == from_pos + 1) {
                            continue;
                        }
                        // Neighbors on the route as it looks after removal.
                        let (before, after, to_pos) = if to_route == from_route {
                            let adjusted = if pos > from_pos { pos - 1 } else { pos };
                            let skip = |i: usize| if i >= from_pos { i + 1 } else { i };
                            (route[skip(adjusted - 1)], route[skip(adjusted)], adjusted)
                        } else {
                            (dest[pos - 1], dest[pos], pos)
                        };
                        let insertion_cost = model.distance(before, node)
                            + model.distance(node, after)
                            - model.distance(before, after);
                        let gain = removal_gain - insertion_cost;
                        candidates.push(Candidate {
                            kind: MoveKind::Relocate { from_route, from_pos, to_route, to_pos },
                            gain,
                        });
                    }
                }
            }
        }

        SearchOutcome::Candidates(candidates)
    }
}
