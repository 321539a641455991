//! Dense (distance, travel time) matrix and metric sources.

use crate::error::SolverError;
use crate::models::{Node, Vehicle};

/// A source of distance and travel time between two nodes for a vehicle.
///
/// A metric may be partial; returning `None` for any pair fed to it during
/// matrix construction fails the model build fast (a non-total metric is an
/// input error, not something the search can recover from).
pub trait Metric {
    /// Returns `(distance, travel_time)` between two nodes, or `None` if
    /// the pair is not covered.
    fn measure(&self, from: &Node, to: &Node, vehicle: &Vehicle) -> Option<(f64, f64)>;
}

/// Straight-line distance; travel time = distance / speed.
///
/// # Examples
///
/// ```
/// use fleet_routing::distance::{EuclideanMetric, Metric};
/// use fleet_routing::models::{Node, Vehicle};
///
/// let a = Node::depot(0, 0.0, 0.0);
/// let b = Node::customer(1, 3.0, 4.0, vec![1.0], 0.0);
/// let v = Vehicle::new(0, vec![10.0]);
///
/// let (dist, time) = EuclideanMetric::new().measure(&a, &b, &v).unwrap();
/// assert!((dist - 5.0).abs() < 1e-10);
/// assert!((time - 5.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMetric {
    speed: f64,
}

impl EuclideanMetric {
    /// Creates a Euclidean metric with speed 1 (time == distance).
    pub fn new() -> Self {
        Self { speed: 1.0 }
    }

    /// Sets the travel speed used to derive time from distance.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

impl Default for EuclideanMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl Metric for EuclideanMetric {
    fn measure(&self, from: &Node, to: &Node, _vehicle: &Vehicle) -> Option<(f64, f64)> {
        if self.speed <= 0.0 {
            return None;
        }
        let d = from.distance_to(to);
        Some((d, d / self.speed))
    }
}

/// A dense n×n matrix of precomputed (distance, travel time) pairs.
///
/// Shared read-only for the duration of a run; lookups are O(1) reads.
#[derive(Debug, Clone)]
pub struct MetricMatrix {
    distances: Vec<f64>,
    times: Vec<f64>,
    size: usize,
}

impl MetricMatrix {
    /// Precomputes the matrix by feeding every node pair to the metric.
    ///
    /// Fails with [`SolverError::InvalidInput`] on the first pair the
    /// metric does not cover.
    pub fn from_metric(
        nodes: &[Node],
        vehicle: &Vehicle,
        metric: &dyn Metric,
    ) -> Result<Self, SolverError> {
        let n = nodes.len();
        let mut distances = vec![0.0; n * n];
        let mut times = vec![0.0; n * n];
        for (i, from) in nodes.iter().enumerate() {
            for (j, to) in nodes.iter().enumerate() {
                let (d, t) = metric.measure(from, to, vehicle).ok_or_else(|| {
                    SolverError::invalid_input(format!(
                        "metric undefined for node pair ({}, {})",
                        from.id(),
                        to.id()
                    ))
                })?;
                distances[i * n + j] = d;
                times[i * n + j] = t;
            }
        }
        Ok(Self { distances, times, size: n })
    }

    /// Creates a matrix from explicit n×n grids (time defaults to distance
    /// when `times` is `None`).
    ///
    /// Returns `None` if a grid length does not match `size * size`.
    pub fn from_data(size: usize, distances: Vec<f64>, times: Option<Vec<f64>>) -> Option<Self> {
        if distances.len() != size * size {
            return None;
        }
        let times = match times {
            Some(t) if t.len() != size * size => return None,
            Some(t) => t,
            None => distances.clone(),
        };
        Some(Self { distances, times, size })
    }

    /// Distance from node `from` to node `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.size + to]
    }

    /// Travel time from node `from` to node `to`.
    pub fn travel_time(&self, from: usize, to: usize) -> f64 {
        self.times[from * self.size + to]
    }

    /// Number of nodes covered by this matrix.
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nodes() -> Vec<Node> {
        vec![
            Node::depot(0, 0.0, 0.0),
            Node::customer(1, 3.0, 4.0, vec![10.0], 5.0),
            Node::customer(2, 0.0, 8.0, vec![20.0], 5.0),
        ]
    }

    #[test]
    fn test_from_metric_euclidean() {
        let nodes = sample_nodes();
        let v = Vehicle::new(0, vec![100.0]);
        let m = MetricMatrix::from_metric(&nodes, &v, &EuclideanMetric::new()).expect("total");
        assert_eq!(m.size(), 3);
        assert!((m.distance(0, 1) - 5.0).abs() < 1e-10);
        assert!((m.distance(0, 2) - 8.0).abs() < 1e-10);
        assert!((m.distance(0, 0)).abs() < 1e-10);
        assert!((m.travel_time(0, 1) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_speed_scales_time_not_distance() {
        let nodes = sample_nodes();
        let v = Vehicle::new(0, vec![100.0]);
        let metric = EuclideanMetric::new().with_speed(2.0);
        let m = MetricMatrix::from_metric(&nodes, &v, &metric).expect("total");
        assert!((m.distance(0, 1) - 5.0).abs() < 1e-10);
        assert!((m.travel_time(0, 1) - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_non_total_metric_fails_fast() {
        struct Partial;
        impl Metric for Partial {
            fn measure(&self, from: &Node, to: &Node, _v: &Vehicle) -> Option<(f64, f64)> {
                if from.id() == 1 && to.id() == 2 {
                    None
                } else {
                    Some((1.0, 1.0))
                }
            }
        }
        let nodes = sample_nodes();
        let v = Vehicle::new(0, vec![100.0]);
        let err = MetricMatrix::from_metric(&nodes, &v, &Partial).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }

    #[test]
    fn test_from_data() {
        let m = MetricMatrix::from_data(2, vec![0.0, 5.0, 5.0, 0.0], None).expect("valid");
        assert_eq!(m.distance(0, 1), 5.0);
        assert_eq!(m.travel_time(0, 1), 5.0);

        let m = MetricMatrix::from_data(2, vec![0.0, 5.0, 5.0, 0.0], Some(vec![0.0, 2.0, 2.0, 0.0]))
            .expect("valid");
        assert_eq!(m.travel_time(0, 1), 2.0);
    }

    #[test]
    fn test_from_data_invalid_size() {
        assert!(MetricMatrix::from_data(2, vec![0.0, 1.0, 2.0], None).is_none());
        assert!(MetricMatrix::from_data(2, vec![0.0; 4], Some(vec![0.0; 3])).is_none());
    }
}
