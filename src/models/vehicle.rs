//! Vehicle type with capacity, limit, and cost parameters.

use serde::{Deserialize, Serialize};

/// A vehicle that services routes in a routing problem.
///
/// # Examples
///
/// ```
/// use fleet_routing::models::Vehicle;
///
/// let v = Vehicle::new(0, vec![200.0]);
/// assert_eq!(v.id(), 0);
/// assert_eq!(v.capacity(), &[200.0]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    id: usize,
    capacity: Vec<f64>,
    cost_per_distance: f64,
    fixed_cost: f64,
    max_route_duration: Option<f64>,
    max_stop_count: Option<usize>,
    max_waiting_time: Option<f64>,
    shift_driving_time: Option<f64>,
    shift_rest_time: f64,
    count: usize,
}

impl Vehicle {
    /// Creates a vehicle with the given ID and per-compartment capacities.
    ///
    /// Default: cost_per_distance = 1.0, no fixed cost, no duration /
    /// stop-count / waiting / driving-time limits, unlimited count.
    pub fn new(id: usize, capacity: Vec<f64>) -> Self {
        Self {
            id,
            capacity,
            cost_per_distance: 1.0,
            fixed_cost: 0.0,
            max_route_duration: None,
            max_stop_count: None,
            max_waiting_time: None,
            shift_driving_time: None,
            shift_rest_time: 0.0,
            count: usize::MAX,
        }
    }

    /// Sets cost per unit distance.
    pub fn with_cost_per_distance(mut self, cost: f64) -> Self {
        self.cost_per_distance = cost;
        self
    }

    /// Sets fixed cost for using this vehicle.
    pub fn with_fixed_cost(mut self, cost: f64) -> Self {
        self.fixed_cost = cost;
        self
    }

    /// Sets maximum route duration.
    pub fn with_max_route_duration(mut self, max: f64) -> Self {
        self.max_route_duration = Some(max);
        self
    }

    /// Sets maximum number of stops per route.
    pub fn with_max_stop_count(mut self, max: usize) -> Self {
        self.max_stop_count = Some(max);
        self
    }

    /// Sets maximum waiting time per stop.
    pub fn with_max_waiting_time(mut self, max: f64) -> Self {
        self.max_waiting_time = Some(max);
        self
    }

    /// Sets the per-shift driving time limit and the rest inserted between
    /// shifts.
    pub fn with_shift(mut self, driving_time: f64, rest_time: f64) -> Self {
        self.shift_driving_time = Some(driving_time);
        self.shift_rest_time = rest_time;
        self
    }

    /// Sets the number of available vehicles of this type.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Vehicle ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Per-compartment load capacities.
    pub fn capacity(&self) -> &[f64] {
        &self.capacity
    }

    /// Number of compartments.
    pub fn num_compartments(&self) -> usize {
        self.capacity.len()
    }

    /// Cost per unit distance traveled.
    pub fn cost_per_distance(&self) -> f64 {
        self.cost_per_distance
    }

    /// Fixed cost for using this vehicle (independent of distance).
    pub fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }

    /// Maximum route duration, if any.
    pub fn max_route_duration(&self) -> Option<f64> {
        self.max_route_duration
    }

    /// Maximum stop count, if any.
    pub fn max_stop_count(&self) -> Option<usize> {
        self.max_stop_count
    }

    /// Maximum waiting time per stop, if any.
    pub fn max_waiting_time(&self) -> Option<f64> {
        self.max_waiting_time
    }

    /// Per-shift driving time limit, if any.
    pub fn shift_driving_time(&self) -> Option<f64> {
        self.shift_driving_time
    }

    /// Rest time inserted once the per-shift driving limit is reached.
    pub fn shift_rest_time(&self) -> f64 {
        self.shift_rest_time
    }

    /// Number of available vehicles of this type.
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_new() {
        let v = Vehicle::new(0, vec![200.0]);
        assert_eq!(v.id(), 0);
        assert_eq!(v.capacity(), &[200.0]);
        assert_eq!(v.num_compartments(), 1);
        assert_eq!(v.cost_per_distance(), 1.0);
        assert_eq!(v.fixed_cost(), 0.0);
        assert!(v.max_route_duration().is_none());
        assert!(v.max_stop_count().is_none());
        assert!(v.max_waiting_time().is_none());
        assert!(v.shift_driving_time().is_none());
        assert_eq!(v.count(), usize::MAX);
    }

    #[test]
    fn test_vehicle_builder() {
        let v = Vehicle::new(1, vec![100.0, 50.0])
            .with_cost_per_distance(1.5)
            .with_fixed_cost(50.0)
            .with_max_route_duration(480.0)
            .with_max_stop_count(20)
            .with_max_waiting_time(30.0)
            .with_shift(270.0, 45.0)
            .with_count(4);
        assert_eq!(v.num_compartments(), 2);
        assert_eq!(v.cost_per_distance(), 1.5);
        assert_eq!(v.fixed_cost(), 50.0);
        assert_eq!(v.max_route_duration(), Some(480.0));
        assert_eq!(v.max_stop_count(), Some(20));
        assert_eq!(v.max_waiting_time(), Some(30.0));
        assert_eq!(v.shift_driving_time(), Some(270.0));
        assert_eq!(v.shift_rest_time(), 45.0);
        assert_eq!(v.count(), 4);
    }
}
