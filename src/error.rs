//! Solver error types.
//!
//! Only two failure classes cross component boundaries as errors:
//! structural contract violations (an upstream builder bug) and invalid
//! user input. Infeasibility discovered during search is *not* an error;
//! it flows through [`Quality`](crate::models::Quality) penalties.

use thiserror::Error;

/// Errors raised by model construction and the optimization engine.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A structural contract was violated (e.g., a route without depot
    /// bookends, an out-of-range node id, a duplicate block position).
    ///
    /// Non-recoverable: indicates a bug in the calling code, not bad user
    /// input.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The model input is invalid (e.g., no depot, no vehicle,
    /// non-positive capacity, a metric undefined for some node pair).
    ///
    /// Reported through the status channel and returned to the caller;
    /// the run aborts without retry.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SolverError {
    /// Shorthand for a structural error.
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Shorthand for an input-validity error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
