//! Construction heuristics for initial solutions.
//!
//! - [`savings`] — parallel savings merging with endpoint tables, an
//!   optional λ sweep, and forced consolidation down to the vehicle count

mod savings;

pub use savings::{savings, SavingsConfig, LAMBDA_SWEEP};
