//! Model: validated, read-only problem data for one optimization run.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::distance::{EuclideanMetric, Metric, MetricMatrix};
use crate::error::SolverError;
use crate::models::{Node, SiteType, Solution, Vehicle};

/// Run parameters carried by the model.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Outer ILS iteration budget.
    pub loop_budget: usize,
    /// Wall-clock budget, checked once per outer iteration.
    pub time_limit: Option<Duration>,
    /// When set, routes do not travel the final leg back to the depot.
    pub open_routes: bool,
    /// When set, the depot's service time is counted as loading time before
    /// departure.
    pub depot_loading_time: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            loop_budget: 64,
            time_limit: None,
            open_routes: false,
            depot_loading_time: false,
        }
    }
}

impl RunParams {
    /// Sets the outer iteration budget.
    pub fn with_loop_budget(mut self, budget: usize) -> Self {
        self.loop_budget = budget;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Enables open routes (no return leg to the depot).
    pub fn with_open_routes(mut self) -> Self {
        self.open_routes = true;
        self
    }

    /// Counts depot service time as loading time before departure.
    pub fn with_depot_loading_time(mut self) -> Self {
        self.depot_loading_time = true;
        self
    }
}

/// A validated routing problem instance: node arena, vehicle, precomputed
/// metric matrix, and run parameters. Read-only during a run.
///
/// # Examples
///
/// ```
/// use fleet_routing::models::{Model, Node, Vehicle};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::customer(1, 3.0, 4.0, vec![10.0], 0.0),
/// ];
/// let model = Model::builder(nodes, Vehicle::new(0, vec![100.0]))
///     .build()
///     .unwrap();
/// assert_eq!(model.depots(), &[0]);
/// assert!((model.distance(0, 1) - 5.0).abs() < 1e-10);
/// ```
#[derive(Debug)]
pub struct Model {
    nodes: Vec<Node>,
    vehicle: Vehicle,
    matrix: MetricMatrix,
    params: RunParams,
    depots: Vec<usize>,
    customers: Vec<usize>,
    block_sizes: BTreeMap<usize, usize>,
}

impl Model {
    /// Starts building a model from nodes and a vehicle.
    pub fn builder(nodes: Vec<Node>, vehicle: Vehicle) -> ModelBuilder {
        ModelBuilder {
            nodes,
            vehicle,
            metric: Box::new(EuclideanMetric::new()),
            params: RunParams::default(),
        }
    }

    /// All nodes, indexed by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// One node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// Number of nodes (all site types).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The vehicle for this run.
    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    /// Run parameters.
    pub fn params(&self) -> &RunParams {
        &self.params
    }

    /// Ids of depot nodes.
    pub fn depots(&self) -> &[usize] {
        &self.depots
    }

    /// Ids of customer nodes.
    pub fn customers(&self) -> &[usize] {
        &self.customers
    }

    /// Declared member count per block id.
    pub fn block_sizes(&self) -> &BTreeMap<usize, usize> {
        &self.block_sizes
    }

    /// O(1) distance lookup.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.matrix.distance(from, to)
    }

    /// O(1) travel time lookup.
    pub fn travel_time(&self, from: usize, to: usize) -> f64 {
        self.matrix.travel_time(from, to)
    }

    /// Creates an empty solution bound to this model's depot set.
    pub fn empty_solution(&self) -> Solution {
        Solution::new(self.depots.iter().copied())
    }
}

/// Builder that validates input and precomputes the metric matrix.
pub struct ModelBuilder {
    nodes: Vec<Node>,
    vehicle: Vehicle,
    metric: Box<dyn Metric>,
    params: RunParams,
}

impl ModelBuilder {
    /// Sets the metric (default: Euclidean, speed 1).
    pub fn with_metric(mut self, metric: impl Metric + 'static) -> Self {
        self.metric = Box::new(metric);
        self
    }

    /// Sets the run parameters.
    pub fn with_params(mut self, params: RunParams) -> Self {
        self.params = params;
        self
    }

    /// Validates the input and builds the model.
    ///
    /// Structural violations (non-contiguous ids, duplicate block
    /// positions) are [`SolverError::IllegalState`]; input problems (no
    /// depot, non-positive capacity, partial metric) are
    /// [`SolverError::InvalidInput`].
    pub fn build(self) -> Result<Model, SolverError> {
        let Self { nodes, vehicle, metric, params } = self;

        for (i, node) in nodes.iter().enumerate() {
            if node.id() != i {
                return Err(SolverError::illegal_state(format!(
                    "node id {} at index {i}; ids must be dense and in order",
                    node.id()
                )));
            }
        }

        let depots: Vec<usize> = nodes
            .iter()
            .filter(|n| n.site_type() == SiteType::Depot)
            .map(|n| n.id())
            .collect();
        if depots.is_empty() {
            return Err(SolverError::invalid_input("model contains no depot"));
        }

        let customers: Vec<usize> = nodes
            .iter()
            .filter(|n| n.site_type() == SiteType::Customer)
            .map(|n| n.id())
            .collect();

        if vehicle.num_compartments() == 0 {
            return Err(SolverError::invalid_input("vehicle has no compartments"));
        }
        if vehicle.capacity().iter().any(|&c| c <= 0.0) {
            return Err(SolverError::invalid_input("vehicle capacity must be positive"));
        }
        if vehicle.count() == 0 {
            return Err(SolverError::invalid_input("vehicle count must be positive"));
        }
        for node in &nodes {
            if node.demand().len() > vehicle.num_compartments()
                && node.site_type() == SiteType::Customer
            {
                return Err(SolverError::invalid_input(format!(
                    "node {} declares {} compartments, vehicle has {}",
                    node.id(),
                    node.demand().len(),
                    vehicle.num_compartments()
                )));
            }
        }

        let mut block_sizes = BTreeMap::new();
        let mut seen_positions: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for node in &nodes {
            if let Some(block) = node.block() {
                *block_sizes.entry(block.block_id).or_insert(0) += 1;
                if let Some(pos) = block.position {
                    let positions = seen_positions.entry(block.block_id).or_default();
                    if positions.contains(&pos) {
                        return Err(SolverError::illegal_state(format!(
                            "duplicate position {pos} in block {}",
                            block.block_id
                        )));
                    }
                    positions.push(pos);
                }
            }
        }

        let matrix = MetricMatrix::from_metric(&nodes, &vehicle, metric.as_ref())?;

        Ok(Model {
            nodes,
            vehicle,
            matrix,
            params,
            depots,
            customers,
            block_sizes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Block;

    fn basic_nodes() -> Vec<Node> {
        vec![
            Node::depot(0, 0.0, 0.0),
            Node::customer(1, 1.0, 0.0, vec![5.0], 0.0),
            Node::customer(2, 2.0, 0.0, vec![5.0], 0.0),
        ]
    }

    #[test]
    fn test_build_basic_model() {
        let model = Model::builder(basic_nodes(), Vehicle::new(0, vec![20.0]))
            .build()
            .expect("valid model");
        assert_eq!(model.num_nodes(), 3);
        assert_eq!(model.depots(), &[0]);
        assert_eq!(model.customers(), &[1, 2]);
        assert!((model.distance(1, 2) - 1.0).abs() < 1e-10);
        assert!((model.travel_time(1, 2) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_build_requires_depot() {
        let nodes = vec![Node::customer(0, 1.0, 0.0, vec![5.0], 0.0)];
        let err = Model::builder(nodes, Vehicle::new(0, vec![20.0]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }

    #[test]
    fn test_build_rejects_non_dense_ids() {
        let nodes = vec![Node::depot(0, 0.0, 0.0), Node::customer(5, 1.0, 0.0, vec![1.0], 0.0)];
        let err = Model::builder(nodes, Vehicle::new(0, vec![20.0]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SolverError::IllegalState(_)));
    }

    #[test]
    fn test_build_rejects_non_positive_capacity() {
        let err = Model::builder(basic_nodes(), Vehicle::new(0, vec![0.0]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_block_position() {
        let mut nodes = basic_nodes();
        nodes[1] = nodes[1]
            .clone()
            .with_block(Block { block_id: 0, position: Some(1), rank: 0 });
        nodes[2] = nodes[2]
            .clone()
            .with_block(Block { block_id: 0, position: Some(1), rank: 0 });
        let err = Model::builder(nodes, Vehicle::new(0, vec![20.0]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SolverError::IllegalState(_)));
    }

    #[test]
    fn test_block_sizes_counted() {
        let mut nodes = basic_nodes();
        nodes[1] = nodes[1]
            .clone()
            .with_block(Block { block_id: 3, position: None, rank: 0 });
        nodes[2] = nodes[2]
            .clone()
            .with_block(Block { block_id: 3, position: None, rank: 1 });
        let model = Model::builder(nodes, Vehicle::new(0, vec![20.0]))
            .build()
            .expect("valid model");
        assert_eq!(model.block_sizes().get(&3), Some(&2));
    }

    #[test]
    fn test_empty_solution_knows_depots() {
        let model = Model::builder(basic_nodes(), Vehicle::new(0, vec![20.0]))
            .build()
            .expect("valid model");
        let sol = model.empty_solution();
        assert!(sol.is_depot(0));
        assert!(!sol.is_depot(1));
    }

    #[test]
    fn test_run_params_builder() {
        let p = RunParams::default()
            .with_loop_budget(10)
            .with_time_limit(Duration::from_secs(5))
            .with_open_routes()
            .with_depot_loading_time();
        assert_eq!(p.loop_budget, 10);
        assert_eq!(p.time_limit, Some(Duration::from_secs(5)));
        assert!(p.open_routes);
        assert!(p.depot_loading_time);
    }
}
