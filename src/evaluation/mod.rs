//! Route feasibility checking and cost evaluation.
//!
//! - [`EvaluationService`] — deterministic route/solution simulator
//!   producing a [`Quality`](crate::models::Quality)

mod context;
mod evaluator;

pub use evaluator::EvaluationService;
