//! Iterated local search: the outer optimization loop.
//!
//! One iteration perturbs the working solution, intensifies it by running
//! the registered operators to convergence, and unconditionally accepts the
//! result as the next working solution. The best-fitness solution seen
//! across all iterations is tracked separately and returned.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::constructive::{savings, SavingsConfig};
use crate::error::SolverError;
use crate::evaluation::EvaluationService;
use crate::local_search::{
    improve_to_convergence, ImproveResult, MoveKind, Operator, RelocateOperator,
    SegmentMoveOperator, ThreePointOperator,
};
use crate::models::{Model, Quality, Solution};
use crate::status::{StatusCode, StatusSink};

/// Configuration for the ILS controller.
///
/// # Examples
///
/// ```
/// use fleet_routing::ils::IlsConfig;
///
/// let config = IlsConfig::default()
///     .with_max_iterations(128)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone)]
pub struct IlsConfig {
    max_iterations: usize,
    time_limit: Option<Duration>,
    seed: u64,
    perturbation_moves: usize,
    max_perturbation_attempts: usize,
}

impl Default for IlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            time_limit: None,
            seed: 0,
            perturbation_moves: 3,
            max_perturbation_attempts: 20,
        }
    }
}

impl IlsConfig {
    /// Derives a config from a model's run parameters.
    pub fn from_params(params: &crate::models::RunParams) -> Self {
        let mut config = Self::default().with_max_iterations(params.loop_budget);
        config.time_limit = params.time_limit;
        config
    }

    /// Sets the outer iteration budget.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Sets the wall-clock budget, checked once per outer iteration.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Seeds the controller's PRNG. Identical seeds reproduce identical
    /// runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets how many random relocations one perturbation performs.
    pub fn with_perturbation_moves(mut self, moves: usize) -> Self {
        self.perturbation_moves = moves;
        self
    }

    /// Caps the retries per perturbation move before giving up on it.
    pub fn with_max_perturbation_attempts(mut self, attempts: usize) -> Self {
        self.max_perturbation_attempts = attempts;
        self
    }
}

struct WeightedOperator {
    operator: Box<dyn Operator>,
    weight: f64,
}

/// The ILS controller: owns the operator roster and drives the
/// perturb/intensify/accept loop.
pub struct IlsOptimizer {
    config: IlsConfig,
    operators: Vec<WeightedOperator>,
}

impl IlsOptimizer {
    /// Creates a controller with the default operator roster:
    /// relocate 0.4, segment-move 0.4, three-point 0.2.
    pub fn new(config: IlsConfig) -> Self {
        Self {
            config,
            operators: vec![
                WeightedOperator { operator: Box::new(RelocateOperator), weight: 0.4 },
                WeightedOperator { operator: Box::new(SegmentMoveOperator), weight: 0.4 },
                WeightedOperator { operator: Box::new(ThreePointOperator), weight: 0.2 },
            ],
        }
    }

    /// Replaces the operator roster with an empty one.
    pub fn clear_operators(&mut self) {
        self.operators.clear();
    }

    /// Registers an operator with a selection weight.
    pub fn register(&mut self, operator: impl Operator + 'static, weight: f64) {
        self.operators.push(WeightedOperator { operator: Box::new(operator), weight });
    }

    /// Runs the loop from an initial solution and returns the best
    /// solution seen with its quality.
    pub fn optimize(
        &self,
        model: &Model,
        initial: Solution,
        status: &dyn StatusSink,
    ) -> Result<(Solution, Quality), SolverError> {
        let start = Instant::now();
        let deadline = self.config.time_limit.map(|limit| start + limit);
        let evaluator = EvaluationService::new(model);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut current = initial;
        let mut best = current.copy();
        let mut best_quality = evaluator.check(&best)?;

        for iteration in 0..self.config.max_iterations {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            status.update(StatusCode::Running, &format!("iteration {iteration}"));

            let mut candidate = current.copy();
            self.perturb(&mut candidate, model, &evaluator, &mut rng)?;
            self.intensify(&mut candidate, model, &evaluator, deadline, status, &mut rng)?;
            candidate.remove_empty_routes();

            let quality = evaluator.check(&candidate)?;
            if quality.fitness() < best_quality.fitness() {
                debug!(
                    iteration,
                    fitness = quality.fitness(),
                    cost = quality.cost(),
                    "new best solution"
                );
                best = candidate.copy();
                best_quality = quality;
            }
            // Diversification: the candidate always becomes the working
            // solution, improved or not.
            current = candidate;
        }

        status.update(
            StatusCode::Finished,
            &format!("best fitness {:.3}", best_quality.fitness()),
        );
        Ok((best, best_quality))
    }

    /// Relocates a few random nodes (or whole contiguous block runs) to
    /// random feasible destinations. Purely diversifying.
    fn perturb(
        &self,
        solution: &mut Solution,
        model: &Model,
        evaluator: &EvaluationService<'_>,
        rng: &mut StdRng,
    ) -> Result<(), SolverError> {
        for _ in 0..self.config.perturbation_moves {
            for _ in 0..self.config.max_perturbation_attempts {
                let Some(kind) = random_segment_move(solution, model, rng) else {
                    continue;
                };
                kind.apply(solution);
                if evaluator.check(solution)?.is_feasible() {
                    break;
                }
                kind.reverse(solution);
            }
        }
        Ok(())
    }

    /// Runs weighted-random operator selection until every operator is
    /// simultaneously exhausted.
    fn intensify(
        &self,
        solution: &mut Solution,
        model: &Model,
        evaluator: &EvaluationService<'_>,
        deadline: Option<Instant>,
        status: &dyn StatusSink,
        rng: &mut StdRng,
    ) -> Result<(), SolverError> {
        if self.operators.is_empty() {
            return Ok(());
        }
        let mut exhausted = vec![false; self.operators.len()];

        while exhausted.iter().any(|&e| !e) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let idx = pick_weighted(&self.operators, &exhausted, rng);
            let entry = &self.operators[idx];
            match improve_to_convergence(
                entry.operator.as_ref(),
                solution,
                model,
                evaluator,
                deadline,
            )? {
                ImproveResult::Improved => {
                    // Give every operator another turn; this one just
                    // converged, so it sits out until someone else improves.
                    for flag in &mut exhausted {
                        *flag = false;
                    }
                    exhausted[idx] = true;
                }
                ImproveResult::Exhausted => exhausted[idx] = true,
                ImproveResult::Unsupported(reason) => {
                    status.update(
                        StatusCode::Exception,
                        &format!("operator {} skipped: {reason}", entry.operator.name()),
                    );
                    exhausted[idx] = true;
                }
            }
        }
        Ok(())
    }
}

/// Picks an operator index by weight among the non-exhausted ones.
fn pick_weighted(operators: &[WeightedOperator], exhausted: &[bool], rng: &mut StdRng) -> usize {
    let total: f64 = operators
        .iter()
        .zip(exhausted)
        .filter(|(_, &e)| !e)
        .map(|(op, _)| op.weight)
        .sum();
    let mut ticket = rng.random_range(0.0..total.max(f64::MIN_POSITIVE));
    let mut fallback = 0;
    for (idx, (op, &e)) in operators.iter().zip(exhausted).enumerate() {
        if e {
            continue;
        }
        fallback = idx;
        if ticket < op.weight {
            return idx;
        }
        ticket -= op.weight;
    }
    fallback
}

/// Draws a random movable node (extended to its whole contiguous block run)
/// and a random destination, as a segment move. Returns `None` when the
/// draw lands on something immovable.
fn random_segment_move(
    solution: &Solution,
    model: &Model,
    rng: &mut StdRng,
) -> Option<MoveKind> {
    if solution.num_routes() == 0 {
        return None;
    }
    let from_route = rng.random_range(0..solution.num_routes());
    let route = solution.route(from_route);
    if route.len() <= 2 {
        return None;
    }
    let pos = rng.random_range(1..route.len() - 1);
    if solution.is_depot(route[pos]) {
        return None;
    }
    let (from_pos, len) = block_run(route, model, pos);

    let to_route = rng.random_range(0..solution.num_routes());
    let dest_len = solution.route(to_route).len();
    if dest_len < 2 {
        return None;
    }
    let raw = rng.random_range(1..dest_len);
    if to_route == from_route && (from_pos..=from_pos + len).contains(&raw) {
        return None;
    }
    let to_pos = if to_route == from_route && raw > from_pos {
        raw - len
    } else {
        raw
    };
    Some(MoveKind::Segment { from_route, from_pos, len, to_route, to_pos, invert: false })
}

/// Extends a position to the contiguous run of nodes sharing its block id.
/// Non-block nodes yield a run of one.
fn block_run(route: &[usize], model: &Model, pos: usize) -> (usize, usize) {
    let Some(block) = model.node(route[pos]).block() else {
        return (pos, 1);
    };
    let in_block = |id: usize| {
        model
            .node(id)
            .block()
            .is_some_and(|b| b.block_id == block.block_id)
    };
    let mut start = pos;
    while start > 1 && in_block(route[start - 1]) {
        start -= 1;
    }
    let mut end = pos;
    while end + 2 < route.len() && in_block(route[end + 1]) {
        end += 1;
    }
    (start, end - start + 1)
}

/// Runs the full pipeline: savings construction followed by ILS driven by
/// the model's run parameters.
///
/// Input errors are reported on the status channel as `Abort` and returned
/// to the caller.
pub fn optimize(
    model: &Model,
    status: &dyn StatusSink,
) -> Result<(Solution, Quality), SolverError> {
    let run = || -> Result<(Solution, Quality), SolverError> {
        let initial = savings(model, &SavingsConfig::default())?;
        let optimizer = IlsOptimizer::new(IlsConfig::from_params(model.params()));
        optimizer.optimize(model, initial, status)
    };
    match run() {
        Ok(result) => Ok(result),
        Err(err) => {
            status.update(StatusCode::Abort, &err.to_string());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, Node, Vehicle};
    use crate::status::CollectingStatus;

    fn cluster_model(loop_budget: usize) -> Model {
        let nodes = vec![
            Node::depot(0, 0.0, 0.0),
            Node::customer(1, 1.0, 1.0, vec![2.0], 0.0),
            Node::customer(2, 2.0, 1.0, vec![2.0], 0.0),
            Node::customer(3, -1.0, -1.0, vec![2.0], 0.0),
            Node::customer(4, -2.0, -1.0, vec![2.0], 0.0),
            Node::customer(5, 2.0, 2.0, vec![2.0], 0.0),
        ];
        Model::builder(nodes, Vehicle::new(0, vec![6.0]))
            .with_params(crate::models::RunParams::default().with_loop_budget(loop_budget))
            .build()
            .expect("valid model")
    }

    #[test]
    fn test_optimize_serves_all_customers() {
        let model = cluster_model(16);
        let sink = CollectingStatus::default();
        let (best, quality) = optimize(&model, &sink).expect("run succeeds");
        assert_eq!(best.num_served(), 5);
        assert!(quality.is_feasible());
    }

    #[test]
    fn test_identical_seeds_reproduce_identical_runs() {
        let model = cluster_model(8);
        let initial = savings(&model, &SavingsConfig::default()).expect("construction");
        let sink = CollectingStatus::default();

        let run = |seed: u64| {
            let optimizer = IlsOptimizer::new(
                IlsConfig::default().with_max_iterations(8).with_seed(seed),
            );
            optimizer
                .optimize(&model, initial.copy(), &sink)
                .expect("run succeeds")
        };
        let (sol_a, q_a) = run(7);
        let (sol_b, q_b) = run(7);
        assert_eq!(sol_a.routes(), sol_b.routes());
        assert_eq!(q_a.fitness(), q_b.fitness());
    }

    #[test]
    fn test_best_never_worse_than_initial() {
        let model = cluster_model(8);
        let initial = savings(&model, &SavingsConfig::default()).expect("construction");
        let svc = EvaluationService::new(&model);
        let initial_fitness = svc.check(&initial).expect("check").fitness();

        let sink = CollectingStatus::default();
        let optimizer =
            IlsOptimizer::new(IlsConfig::default().with_max_iterations(8).with_seed(1));
        let (_, quality) = optimizer
            .optimize(&model, initial, &sink)
            .expect("run succeeds");
        assert!(quality.fitness() <= initial_fitness + 1e-9);
    }

    #[test]
    fn test_status_reports_running_and_finished() {
        let model = cluster_model(4);
        let sink = CollectingStatus::default();
        optimize(&model, &sink).expect("run succeeds");
        let events = sink.events();
        assert!(events.iter().any(|(c, _)| *c == StatusCode::Running));
        assert_eq!(events.last().map(|(c, _)| *c), Some(StatusCode::Finished));
    }

    #[test]
    fn test_unsupported_operator_logged_and_skipped() {
        // Two depots make the three-point operator unsupported; the run
        // must log an exception-level event and still finish.
        let nodes = vec![
            Node::depot(0, 0.0, 0.0),
            Node::depot(1, 10.0, 0.0),
            Node::customer(2, 1.0, 0.0, vec![1.0], 0.0),
            Node::customer(3, 9.0, 0.0, vec![1.0], 0.0),
        ];
        let model = Model::builder(nodes, Vehicle::new(0, vec![5.0]))
            .with_params(crate::models::RunParams::default().with_loop_budget(2))
            .build()
            .expect("valid model");

        let sink = CollectingStatus::default();
        let (best, quality) = optimize(&model, &sink).expect("run succeeds");
        assert_eq!(best.num_served(), 2);
        assert!(quality.is_feasible());
        assert!(sink
            .events()
            .iter()
            .any(|(c, m)| *c == StatusCode::Exception && m.contains("three-point")));
    }

    #[test]
    fn test_abort_reported_on_invalid_input() {
        // A customer whose whitelist matches no depot aborts construction.
        let nodes = vec![
            Node::depot(0, 0.0, 0.0),
            Node::customer(1, 1.0, 0.0, vec![1.0], 0.0).with_allowed_depots([9]),
        ];
        let model = Model::builder(nodes, Vehicle::new(0, vec![5.0]))
            .build()
            .expect("valid model");
        let sink = CollectingStatus::default();
        assert!(optimize(&model, &sink).is_err());
        assert_eq!(
            sink.events().last().map(|(c, _)| *c),
            Some(StatusCode::Abort)
        );
    }

    #[test]
    fn test_operator_selection_varies_across_iterations() {
        use std::sync::{Arc, Mutex};

        struct RecordingOperator {
            label: &'static str,
            log: Arc<Mutex<Vec<&'static str>>>,
        }
        impl Operator for RecordingOperator {
            fn name(&self) -> &'static str {
                self.label
            }
            fn search(&self, _: &Solution, _: &Model) -> crate::local_search::SearchOutcome {
                self.log.lock().expect("log mutex").push(self.label);
                crate::local_search::SearchOutcome::Candidates(Vec::new())
            }
        }

        let model = cluster_model(32);
        let initial = savings(&model, &SavingsConfig::default()).expect("construction");
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut optimizer =
            IlsOptimizer::new(IlsConfig::default().with_max_iterations(32).with_seed(3));
        optimizer.clear_operators();
        optimizer.register(RecordingOperator { label: "a", log: Arc::clone(&log) }, 0.5);
        optimizer.register(RecordingOperator { label: "b", log: Arc::clone(&log) }, 0.5);
        optimizer
            .optimize(&model, initial, &CollectingStatus::default())
            .expect("run succeeds");

        // Each intensification searches both operators exactly once (no
        // candidates, so no resets); the first entry of each pair is the
        // weighted draw. A single PRNG threaded through the whole run must
        // not repeat the same draw every iteration.
        let events = log.lock().expect("log mutex");
        let firsts: Vec<&str> = events.chunks(2).map(|pair| pair[0]).collect();
        assert_eq!(firsts.len(), 32);
        assert!(firsts.contains(&"a"));
        assert!(firsts.contains(&"b"));
    }

    #[test]
    fn test_perturbation_moves_whole_block_run() {
        let block = |pos| Block { block_id: 1, position: Some(pos), rank: 0 };
        let nodes = vec![
            Node::depot(0, 0.0, 0.0),
            Node::customer(1, 1.0, 0.0, vec![1.0], 0.0).with_block(block(0)),
            Node::customer(2, 2.0, 0.0, vec![1.0], 0.0).with_block(block(1)),
            Node::customer(3, 3.0, 0.0, vec![1.0], 0.0).with_block(block(2)),
            Node::customer(4, 4.0, 0.0, vec![1.0], 0.0),
        ];
        let model = Model::builder(nodes, Vehicle::new(0, vec![10.0]))
            .build()
            .expect("valid model");
        let route = vec![0, 1, 2, 3, 4, 0];
        assert_eq!(block_run(&route, &model, 2), (1, 3));
        assert_eq!(block_run(&route, &model, 1), (1, 3));
        assert_eq!(block_run(&route, &model, 4), (4, 1));
    }
}
