//! Domain model types for vehicle routing problems.
//!
//! Provides the core abstractions: nodes with demands, time windows, and
//! preset attributes, vehicles with capacity and limit parameters, solutions
//! as owned route id-sequences, and the validated read-only model that ties
//! everything together.

mod model;
mod node;
mod quality;
mod solution;
mod vehicle;

pub use model::{Model, ModelBuilder, RunParams};
pub use node::{Block, LoadType, Node, SiteType, TimeWindow};
pub use quality::{PenaltyReason, Quality, PENALTY_WEIGHT};
pub use solution::Solution;
pub use vehicle::Vehicle;
