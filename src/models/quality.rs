//! Quality: cost plus penalty accounting for a solution or route.

use serde::{Deserialize, Serialize};

/// Weight applied to the penalty sum when computing fitness.
///
/// Large enough that any infeasibility dominates pure travel cost, so the
/// search always prefers a feasible solution over a cheaper infeasible one.
pub const PENALTY_WEIGHT: f64 = 10_000.0;

/// The constraint class a penalty was accrued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyReason {
    /// Compartment load over vehicle capacity.
    Capacity,
    /// Route duration over the vehicle maximum.
    Duration,
    /// Stop count over the vehicle maximum.
    StopCount,
    /// Arrival after a time window closed, or waiting over the maximum.
    Delay,
    /// Block/preset violation: rank, position, split block, depot whitelist.
    Presetting,
    /// Two mutually blacklisted nodes on one route.
    Blacklist,
}

impl PenaltyReason {
    /// All penalty reasons, in reporting order.
    pub const ALL: [PenaltyReason; 6] = [
        PenaltyReason::Capacity,
        PenaltyReason::Duration,
        PenaltyReason::StopCount,
        PenaltyReason::Delay,
        PenaltyReason::Presetting,
        PenaltyReason::Blacklist,
    ];

    fn index(self) -> usize {
        match self {
            PenaltyReason::Capacity => 0,
            PenaltyReason::Duration => 1,
            PenaltyReason::StopCount => 2,
            PenaltyReason::Delay => 3,
            PenaltyReason::Presetting => 4,
            PenaltyReason::Blacklist => 5,
        }
    }
}

/// The evaluated quality of a route or solution: travel cost plus a
/// non-negative penalty accumulator per constraint class.
///
/// Invariant: `penalty() == 0.0` exactly when every modeled hard constraint
/// holds.
///
/// # Examples
///
/// ```
/// use fleet_routing::models::{PenaltyReason, Quality};
///
/// let mut q = Quality::new();
/// q.add_cost(42.0);
/// assert!(q.is_feasible());
///
/// q.add_penalty(PenaltyReason::Capacity, 3.0);
/// assert!(!q.is_feasible());
/// assert!(q.fitness() > q.cost());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    cost: f64,
    penalties: [f64; 6],
}

impl Quality {
    /// Creates a zero quality (no cost, no penalties).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds travel cost.
    pub fn add_cost(&mut self, cost: f64) {
        self.cost += cost;
    }

    /// Adds penalty under the given reason. `amount` must be non-negative.
    pub fn add_penalty(&mut self, reason: PenaltyReason, amount: f64) {
        debug_assert!(amount >= 0.0);
        self.penalties[reason.index()] += amount;
    }

    /// Accumulates another quality into this one.
    pub fn merge(&mut self, other: &Quality) {
        self.cost += other.cost;
        for (p, o) in self.penalties.iter_mut().zip(other.penalties.iter()) {
            *p += *o;
        }
    }

    /// Travel cost (distance-based plus fixed vehicle costs).
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Penalty accumulated under one reason.
    pub fn penalty_for(&self, reason: PenaltyReason) -> f64 {
        self.penalties[reason.index()]
    }

    /// Total penalty across all reasons.
    pub fn penalty(&self) -> f64 {
        self.penalties.iter().sum()
    }

    /// Returns `true` if no penalty was accrued.
    pub fn is_feasible(&self) -> bool {
        self.penalty() == 0.0
    }

    /// Scalar used to rank solutions: cost plus weighted penalty.
    pub fn fitness(&self) -> f64 {
        self.cost + PENALTY_WEIGHT * self.penalty()
    }
}
