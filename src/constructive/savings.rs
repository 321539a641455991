//! Savings construction: greedy endpoint merging of single-customer routes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SolverError;
use crate::evaluation::EvaluationService;
use crate::models::{Model, Solution};

/// λ values tried by the sweep variant.
pub const LAMBDA_SWEEP: [f64; 6] = [0.6, 1.0, 1.4, 1.6, 2.0, 3.0];

/// Configuration for the savings heuristic.
///
/// The default sweeps all [`LAMBDA_SWEEP`] shape parameters and keeps the
/// best fully-evaluated result; [`with_lambda`](SavingsConfig::with_lambda)
/// pins a single λ instead.
///
/// # Examples
///
/// ```
/// use fleet_routing::constructive::SavingsConfig;
///
/// let config = SavingsConfig::default().with_lambda(1.4);
/// ```
#[derive(Debug, Clone)]
pub struct SavingsConfig {
    lambdas: Vec<f64>,
    max_routes: Option<usize>,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            lambdas: LAMBDA_SWEEP.to_vec(),
            max_routes: None,
        }
    }
}

impl SavingsConfig {
    /// Pins a single λ instead of sweeping.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambdas = vec![lambda];
        self
    }

    /// Overrides the route-count bound (default: the vehicle's count, when
    /// bounded).
    pub fn with_max_routes(mut self, max_routes: usize) -> Self {
        self.max_routes = Some(max_routes);
        self
    }
}

/// Builds an initial solution by Clarke-Wright style savings merging.
///
/// Starts with one route per customer at its nearest allowed depot, then
/// repeatedly merges the highest-saving endpoint pair whose concatenation
/// stays fully feasible. When a route-count bound is exceeded after
/// convergence, a second pass forces merges with non-positive savings until
/// the bound holds or no feasible merge remains.
pub fn savings(model: &Model, config: &SavingsConfig) -> Result<Solution, SolverError> {
    let evaluator = EvaluationService::new(model);
    let assignment = assign_depots(model)?;
    let max_routes = config.max_routes.or_else(|| {
        let count = model.vehicle().count();
        (count != usize::MAX).then_some(count)
    });

    let mut best: Option<(Solution, f64)> = None;
    for &lambda in &config.lambdas {
        let solution = construct(model, &evaluator, &assignment, lambda, max_routes)?;
        let fitness = evaluator.check(&solution)?.fitness();
        debug!(lambda, fitness, routes = solution.num_routes(), "savings pass");
        if best.as_ref().is_none_or(|(_, f)| fitness < *f) {
            best = Some((solution, fitness));
        }
    }

    match best {
        Some((solution, _)) => Ok(solution),
        None => Err(SolverError::invalid_input("no lambda values configured")),
    }
}

/// Maps each customer to its nearest depot among those its whitelist
/// allows.
fn assign_depots(model: &Model) -> Result<BTreeMap<usize, usize>, SolverError> {
    let mut assignment = BTreeMap::new();
    for &c in model.customers() {
        let node = model.node(c);
        let depot = model
            .depots()
            .iter()
            .copied()
            .filter(|&d| node.allows_depot(d))
            .min_by(|&a, &b| model.distance(c, a).total_cmp(&model.distance(c, b)));
        match depot {
            Some(d) => {
                assignment.insert(c, d);
            }
            None => {
                return Err(SolverError::invalid_input(format!(
                    "customer {c} allows none of the model's depots"
                )));
            }
        }
    }
    Ok(assignment)
}

/// One live route during merging: its depot and customer sequence.
struct Slot {
    depot: usize,
    members: Vec<usize>,
}

fn construct(
    model: &Model,
    evaluator: &EvaluationService<'_>,
    assignment: &BTreeMap<usize, usize>,
    lambda: f64,
    max_routes: Option<usize>,
) -> Result<Solution, SolverError> {
    let mut slots: Vec<Option<Slot>> = Vec::new();
    let mut slot_of: BTreeMap<usize, usize> = BTreeMap::new();
    for (&c, &depot) in assignment {
        slot_of.insert(c, slots.len());
        slots.push(Some(Slot { depot, members: vec![c] }));
    }

    // Savings list over same-depot customer pairs, sorted once.
    let customers: Vec<usize> = assignment.keys().copied().collect();
    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (idx, &i) in customers.iter().enumerate() {
        for &j in &customers[idx + 1..] {
            if assignment[&i] != assignment[&j] {
                continue;
            }
            let depot = assignment[&i];
            let saving = model.distance(i, depot) + model.distance(j, depot)
                - lambda * model.distance(i, j);
            pairs.push((saving, i, j));
        }
    }
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut live = slots.len();
    for &(saving, i, j) in &pairs {
        if saving <= 0.0 {
            break;
        }
        if try_merge(model, evaluator, &mut slots, &mut slot_of, i, j)? {
            live -= 1;
        }
    }

    // Forced consolidation: accept non-positive savings until the vehicle
    // count holds or nothing merges any more.
    if let Some(bound) = max_routes {
        while live > bound {
            let mut merged_any = false;
            for &(_, i, j) in &pairs {
                if live <= bound {
                    break;
                }
                if try_merge(model, evaluator, &mut slots, &mut slot_of, i, j)? {
                    live -= 1;
                    merged_any = true;
                }
            }
            if !merged_any {
                debug!(live, bound, "forced consolidation stuck above route bound");
                break;
            }
        }
    }

    let mut solution = model.empty_solution();
    for slot in slots.into_iter().flatten() {
        let mut route = Vec::with_capacity(slot.members.len() + 2);
        route.push(slot.depot);
        route.extend(slot.members);
        route.push(slot.depot);
        solution.add_route(route)?;
    }
    Ok(solution)
}

/// Attempts to merge the routes holding endpoints `i` and `j` into one,
/// reversing either side as needed so the concatenation runs tail-of-one
/// into head-of-other. Commits only if the merged route is fully feasible.
fn try_merge(
    model: &Model,
    evaluator: &EvaluationService<'_>,
    slots: &mut [Option<Slot>],
    slot_of: &mut BTreeMap<usize, usize>,
    i: usize,
    j: usize,
) -> Result<bool, SolverError> {
    let si = slot_of[&i];
    let sj = slot_of[&j];
    if si == sj {
        return Ok(false);
    }
    let (left, right) = match (&slots[si], &slots[sj]) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(false),
    };

    // i must be reachable as the left tail, j as the right head.
    let mut left_members = left.members.clone();
    if *left_members.first().unwrap_or(&i) == i && left_members.len() > 1 {
        left_members.reverse();
    }
    if *left_members.last().unwrap_or(&0) != i {
        return Ok(false); // interior endpoint
    }
    let mut right_members = right.members.clone();
    if *right_members.last().unwrap_or(&j) == j && right_members.len() > 1 {
        right_members.reverse();
    }
    if *right_members.first().unwrap_or(&0) != j {
        return Ok(false);
    }

    let depot = left.depot;
    let mut route = Vec::with_capacity(left_members.len() + right_members.len() + 2);
    route.push(depot);
    route.extend(left_members.iter().copied());
    route.extend(right_members.iter().copied());
    route.push(depot);

    if !evaluator.evaluate_route(&route)?.is_feasible() {
        return Ok(false);
    }

    let mut merged = left_members;
    merged.extend(right_members);
    for &member in &merged {
        slot_of.insert(member, si);
    }
    slots[si] = Some(Slot { depot, members: merged });
    slots[sj] = None;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, TimeWindow, Vehicle};

    fn route_length(model: &Model, route: &[usize]) -> f64 {
        route.windows(2).map(|w| model.distance(w[0], w[1])).sum()
    }

    fn opposite_pair_model(capacity: f64) -> Model {
        let depot = Node::depot(0, 0.0, 0.0).with_time_window(
            TimeWindow::new(0.0, 100.0).expect("valid window"),
        );
        let nodes = vec![
            depot,
            Node::customer(1, 0.0, 10.0, vec![5.0], 0.0),
            Node::customer(2, 0.0, -10.0, vec![5.0], 0.0),
        ];
        Model::builder(nodes, Vehicle::new(0, vec![capacity]))
            .build()
            .expect("valid model")
    }

    #[test]
    fn test_merges_opposite_customers_when_feasible() {
        let model = opposite_pair_model(10.0);
        // saving = 10 + 10 − 0.6·20 = 8 > 0
        let sol = savings(&model, &SavingsConfig::default().with_lambda(0.6))
            .expect("construction succeeds");
        assert_eq!(sol.num_routes(), 1);
        assert_eq!(sol.num_served(), 2);
        assert!((route_length(&model, sol.route(0)) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_keeps_separate_when_capacity_blocks_merge() {
        let model = opposite_pair_model(5.0);
        let sol = savings(&model, &SavingsConfig::default().with_lambda(0.6))
            .expect("construction succeeds");
        assert_eq!(sol.num_routes(), 2);
        assert_eq!(sol.num_served(), 2);
    }

    #[test]
    fn test_non_positive_saving_does_not_merge() {
        let model = opposite_pair_model(10.0);
        // saving = 10 + 10 − 3·20 < 0
        let sol = savings(&model, &SavingsConfig::default().with_lambda(3.0))
            .expect("construction succeeds");
        assert_eq!(sol.num_routes(), 2);
    }

    #[test]
    fn test_forced_consolidation_meets_vehicle_count() {
        let depot = Node::depot(0, 0.0, 0.0);
        let nodes = vec![
            depot,
            Node::customer(1, 0.0, 10.0, vec![5.0], 0.0),
            Node::customer(2, 0.0, -10.0, vec![5.0], 0.0),
        ];
        // saving at λ=1 is exactly 0, so only the forced pass merges.
        let model = Model::builder(nodes, Vehicle::new(0, vec![10.0]).with_count(1))
            .build()
            .expect("valid model");
        let sol = savings(&model, &SavingsConfig::default().with_lambda(1.0))
            .expect("construction succeeds");
        assert_eq!(sol.num_routes(), 1);
        assert_eq!(sol.num_served(), 2);
    }

    #[test]
    fn test_chain_merge_orders_corridor() {
        let mut nodes = vec![Node::depot(0, 0.0, 0.0)];
        for i in 1..=4 {
            nodes.push(Node::customer(i, i as f64, 0.0, vec![1.0], 0.0));
        }
        let model = Model::builder(nodes, Vehicle::new(0, vec![10.0]))
            .build()
            .expect("valid model");
        let sol = savings(&model, &SavingsConfig::default())
            .expect("construction succeeds");
        assert_eq!(sol.num_routes(), 1);
        assert_eq!(sol.num_served(), 4);
        // Corridor optimum: out to x=4 and back.
        assert!((route_length(&model, sol.route(0)) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_never_worse_than_any_single_lambda() {
        let model = opposite_pair_model(10.0);
        let svc = EvaluationService::new(&model);
        let swept = savings(&model, &SavingsConfig::default()).expect("sweep");
        let swept_fitness = svc.check(&swept).expect("check").fitness();
        for &lambda in &LAMBDA_SWEEP {
            let single = savings(&model, &SavingsConfig::default().with_lambda(lambda))
                .expect("single lambda");
            let fitness = svc.check(&single).expect("check").fitness();
            assert!(swept_fitness <= fitness + 1e-9);
        }
    }

    #[test]
    fn test_multi_depot_assignment_respects_whitelist() {
        let nodes = vec![
            Node::depot(0, 0.0, 0.0),
            Node::depot(1, 100.0, 0.0),
            // Nearest depot is 0, but the whitelist only allows 1.
            Node::customer(2, 1.0, 0.0, vec![1.0], 0.0).with_allowed_depots([1]),
            Node::customer(3, 99.0, 0.0, vec![1.0], 0.0),
        ];
        let model = Model::builder(nodes, Vehicle::new(0, vec![10.0]))
            .build()
            .expect("valid model");
        let sol = savings(&model, &SavingsConfig::default()).expect("construction");
        for route in sol.routes() {
            if route.contains(&2) {
                assert_eq!(route[0], 1);
            }
            if route.contains(&3) {
                assert_eq!(route[0], 1);
            }
        }
    }

    #[test]
    fn test_no_allowed_depot_is_invalid_input() {
        let nodes = vec![
            Node::depot(0, 0.0, 0.0),
            Node::customer(1, 1.0, 0.0, vec![1.0], 0.0).with_allowed_depots([7]),
        ];
        let model = Model::builder(nodes, Vehicle::new(0, vec![10.0]))
            .build()
            .expect("valid model");
        let err = savings(&model, &SavingsConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }
}
