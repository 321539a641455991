//! # fleet-routing
//!
//! Vehicle routing optimization engine: a deterministic route evaluator,
//! savings construction, reversible local search moves, and an iterated
//! local search controller.
//!
//! ## Modules
//!
//! - [`models`] — Domain model types (Node, Vehicle, Solution, Quality, Model)
//! - [`distance`] — Metric trait and the precomputed distance/time matrix
//! - [`evaluation`] — Route feasibility checking and cost evaluation
//! - [`constructive`] — Savings construction heuristic
//! - [`local_search`] — Reversible move operators (Relocate, SegmentMove, ThreePoint)
//! - [`ils`] — Iterated local search controller and the `optimize` entry point
//! - [`status`] — One-way status event channel
//! - [`error`] — Solver error types

pub mod constructive;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod ils;
pub mod local_search;
pub mod models;
pub mod status;
