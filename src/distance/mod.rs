//! Distance and travel time metrics.
//!
//! - [`Metric`] — pluggable `(node, node, vehicle) → (distance, time)` source
//! - [`EuclideanMetric`] — straight-line default
//! - [`MetricMatrix`] — dense precomputed matrix with O(1) lookups

mod matrix;

pub use matrix::{EuclideanMetric, Metric, MetricMatrix};
