//! Ephemeral traversal state for route evaluation.

use std::collections::BTreeMap;

use crate::models::{LoadType, Node};

/// Per-block bookkeeping while scanning one route.
#[derive(Debug, Clone, Copy)]
struct BlockState {
    last_rank: i32,
    last_position: Option<usize>,
    last_seq: usize,
}

/// Mutable state threaded through one route scan.
///
/// Created fresh per check, mutated node-by-node, discarded after the scan
/// produces a [`Quality`](crate::models::Quality). Holds cumulative
/// length/time/duration bookkeeping, per-compartment pickup and delivery
/// accumulators, block rank/position state, and the seen-node list used for
/// pairwise blacklist checks.
#[derive(Debug)]
pub(crate) struct Context {
    /// Current simulated clock.
    pub time: f64,
    /// Cumulative route length.
    pub length: f64,
    /// Departure time at the start depot (duration reference point).
    pub departure: f64,
    /// Loading time spent before departure.
    pub loading: f64,
    /// Customer stops counted so far.
    pub stops: usize,
    /// Driving time since the last inter-shift rest.
    pub driving_since_rest: f64,
    /// Id of the last active node.
    pub last: usize,
    /// Whether the last active node was a customer (zero-distance stop
    /// collapsing).
    pub last_was_customer: bool,
    pickup: Vec<f64>,
    delivery: Vec<f64>,
    blocks: BTreeMap<usize, BlockState>,
    seen: Vec<usize>,
}

impl Context {
    /// Fresh state positioned at the start depot.
    pub fn new(depot: usize, departure: f64, loading: f64, num_compartments: usize) -> Self {
        Self {
            time: departure,
            length: 0.0,
            departure,
            loading,
            stops: 0,
            driving_since_rest: 0.0,
            last: depot,
            last_was_customer: false,
            pickup: vec![0.0; num_compartments],
            delivery: vec![0.0; num_compartments],
            blocks: BTreeMap::new(),
            seen: Vec::new(),
        }
    }

    /// Elapsed route duration (loading plus driving/service/waiting).
    pub fn duration(&self) -> f64 {
        self.loading + (self.time - self.departure)
    }

    /// Adds a customer's demand to the load accumulators and returns the
    /// amount over capacity across the per-type and combined checks.
    ///
    /// The combined check is applied to every route; on a single-load-type
    /// route it repeats the per-type check, so an overload there is counted
    /// twice. That asymmetry is inherited behavior, kept deliberately.
    pub fn apply_demand(&mut self, node: &Node, capacity: &[f64]) -> f64 {
        for (c, &amount) in node.demand().iter().enumerate() {
            if c >= capacity.len() {
                break;
            }
            match node.load_type() {
                LoadType::Pickup => self.pickup[c] += amount,
                LoadType::Delivery => self.delivery[c] += amount,
            }
        }

        let mut over = 0.0;
        for (c, &cap) in capacity.iter().enumerate() {
            over += (self.pickup[c] - cap).max(0.0);
            over += (self.delivery[c] - cap).max(0.0);
            over += (self.pickup[c] + self.delivery[c] - cap).max(0.0);
        }
        over
    }

    /// Zeroes the accumulators of the compartments a replenish node serves.
    pub fn replenish(&mut self, node: &Node) {
        for c in 0..self.pickup.len() {
            if node.replenishes(c) {
                self.pickup[c] = 0.0;
                self.delivery[c] = 0.0;
            }
        }
    }

    /// Records a block member and returns the preset penalty units it
    /// triggers: one for a rank decrease, one for a broken position chain
    /// (wrong successor position or a gap in the route).
    ///
    /// `seq` is the node's index in the active route sequence.
    pub fn note_block(&mut self, block_id: usize, rank: i32, position: Option<usize>, seq: usize) -> f64 {
        let mut units = 0.0;
        match self.blocks.get_mut(&block_id) {
            Some(state) => {
                if rank < state.last_rank {
                    units += 1.0;
                }
                state.last_rank = state.last_rank.max(rank);
                if let Some(pos) = position {
                    match state.last_position {
                        Some(prev) if pos != prev + 1 || seq != state.last_seq + 1 => units += 1.0,
                        _ => {}
                    }
                    state.last_position = Some(pos);
                }
                state.last_seq = seq;
            }
            None => {
                self.blocks.insert(
                    block_id,
                    BlockState { last_rank: rank, last_position: position, last_seq: seq },
                );
            }
        }
        units
    }

    /// Counts blacklist conflicts between this node and the nodes already
    /// on the route, then records the node as seen.
    pub fn note_seen(&mut self, node: &Node) -> f64 {
        let hits = self
            .seen
            .iter()
            .filter(|id| node.blacklist().contains(id))
            .count();
        self.seen.push(node.id());
        hits as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    #[test]
    fn test_duration_includes_loading() {
        let mut ctx = Context::new(0, 10.0, 3.0, 1);
        ctx.time = 25.0;
        assert!((ctx.duration() - 18.0).abs() < 1e-10);
    }

    #[test]
    fn test_apply_demand_within_capacity() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        let n = Node::customer(1, 0.0, 0.0, vec![5.0], 0.0);
        assert_eq!(ctx.apply_demand(&n, &[10.0]), 0.0);
        assert_eq!(ctx.apply_demand(&n, &[10.0]), 0.0);
    }

    #[test]
    fn test_apply_demand_overload_counts_type_and_combined() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        let n = Node::customer(1, 0.0, 0.0, vec![12.0], 0.0);
        // delivery 12 vs cap 10: per-type over 2 plus combined over 2
        assert!((ctx.apply_demand(&n, &[10.0]) - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_mixed_load_combined_check() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        let del = Node::customer(1, 0.0, 0.0, vec![6.0], 0.0);
        let pick = Node::customer(2, 0.0, 0.0, vec![6.0], 0.0)
            .with_load_type(crate::models::LoadType::Pickup);
        assert_eq!(ctx.apply_demand(&del, &[10.0]), 0.0);
        // pickup 6 + delivery 6 = 12 > 10, though each type alone fits
        assert!((ctx.apply_demand(&pick, &[10.0]) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_replenish_resets_masked_compartments() {
        let mut ctx = Context::new(0, 0.0, 0.0, 2);
        let n = Node::customer(1, 0.0, 0.0, vec![8.0, 8.0], 0.0);
        ctx.apply_demand(&n, &[10.0, 10.0]);

        let r = Node::replenish(2, 0.0, 0.0, vec![1.0, 0.0]);
        ctx.replenish(&r);
        // Compartment 0 reset, compartment 1 still at 8: adding 8 overflows
        // compartment 1 only (type + combined).
        let over = ctx.apply_demand(&n, &[10.0, 10.0]);
        assert!((over - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_block_rank_monotonic() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        assert_eq!(ctx.note_block(1, 0, None, 1), 0.0);
        assert_eq!(ctx.note_block(1, 2, None, 2), 0.0);
        assert_eq!(ctx.note_block(1, 1, None, 3), 1.0); // rank went down
    }

    #[test]
    fn test_block_positions_must_chain() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        assert_eq!(ctx.note_block(1, 0, Some(0), 1), 0.0);
        assert_eq!(ctx.note_block(1, 0, Some(1), 2), 0.0);
        assert_eq!(ctx.note_block(1, 0, Some(3), 3), 1.0); // skipped 2
    }

    #[test]
    fn test_block_positions_must_be_adjacent_in_route() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        assert_eq!(ctx.note_block(1, 0, Some(0), 1), 0.0);
        // Position 1 follows, but two route slots later
        assert_eq!(ctx.note_block(1, 0, Some(1), 3), 1.0);
    }

    #[test]
    fn test_blacklist_hits() {
        let mut ctx = Context::new(0, 0.0, 0.0, 1);
        let a = Node::customer(1, 0.0, 0.0, vec![1.0], 0.0);
        let b = Node::customer(2, 0.0, 0.0, vec![1.0], 0.0).with_blacklist([1]);
        assert_eq!(ctx.note_seen(&a), 0.0);
        assert_eq!(ctx.note_seen(&b), 1.0);
    }
}
