//! Deterministic route and solution evaluation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::SolverError;
use crate::evaluation::context::Context;
use crate::models::{Model, PenaltyReason, Quality, SiteType, Solution};

/// Evaluates routes against the model by simulating one traversal per
/// route, producing a [`Quality`] (cost plus penalty-by-reason).
///
/// `check` is pure given `(solution, model)`: repeated calls on an
/// unmodified solution return identical results.
///
/// # Examples
///
/// ```
/// use fleet_routing::evaluation::EvaluationService;
/// use fleet_routing::models::{Model, Node, Vehicle};
///
/// let nodes = vec![
///     Node::depot(0, 0.0, 0.0),
///     Node::customer(1, 3.0, 4.0, vec![10.0], 0.0),
/// ];
/// let model = Model::builder(nodes, Vehicle::new(0, vec![100.0])).build().unwrap();
/// let svc = EvaluationService::new(&model);
///
/// let mut sol = model.empty_solution();
/// sol.add_route(vec![0, 1, 0]).unwrap();
/// let q = svc.check(&sol).unwrap();
/// assert!(q.is_feasible());
/// assert!((q.cost() - 10.0).abs() < 1e-10);
/// ```
pub struct EvaluationService<'a> {
    model: &'a Model,
}

impl<'a> EvaluationService<'a> {
    /// Creates an evaluation service over the given model.
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Evaluates one route by scanning it once, linear in route length.
    ///
    /// Fails fast with [`SolverError::IllegalState`] on malformed input
    /// (missing depot bookend, out-of-range node id): that signals an
    /// upstream builder bug, not user input.
    pub fn evaluate_route(&self, route: &[usize]) -> Result<Quality, SolverError> {
        let model = self.model;
        let vehicle = model.vehicle();
        let params = model.params();

        for &id in route {
            if id >= model.num_nodes() {
                return Err(SolverError::illegal_state(format!("node id {id} out of range")));
            }
        }
        let (first, last) = match (route.first(), route.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(SolverError::illegal_state("route must not be empty")),
        };
        if model.node(first).site_type() != SiteType::Depot
            || model.node(last).site_type() != SiteType::Depot
        {
            return Err(SolverError::illegal_state(
                "route must start and end at a depot-site node",
            ));
        }

        let active = self.active_nodes(route);
        let mut quality = Quality::new();
        if active.len() <= 1 {
            return Ok(quality);
        }

        let depot = active[0];
        let depot_node = model.node(depot);
        let depot_open = depot_node
            .applicable_window(0.0)
            .map(|tw| tw.ready())
            .unwrap_or(0.0);
        let loading = if params.depot_loading_time {
            depot_node.service_time()
        } else {
            0.0
        };
        // Depart as late as the first customer's window allows, never
        // earlier than depot open plus loading.
        let implied = model
            .node(active[1])
            .time_windows()
            .first()
            .map(|tw| tw.ready() - model.travel_time(depot, active[1]))
            .unwrap_or(f64::NEG_INFINITY);
        let departure = (depot_open + loading).max(implied);

        let mut ctx = Context::new(depot, departure, loading, vehicle.num_compartments());

        for (seq, &id) in active.iter().enumerate().skip(1) {
            let node = model.node(id);
            let site = node.site_type();
            let closing = seq == active.len() - 1 && site == SiteType::Depot;

            let (dist, time) = if closing && params.open_routes {
                (0.0, 0.0)
            } else {
                (model.distance(ctx.last, id), model.travel_time(ctx.last, id))
            };
            ctx.length += dist;
            ctx.time += time;
            ctx.driving_since_rest += time;

            if let Some(limit) = vehicle.shift_driving_time() {
                if ctx.driving_since_rest >= limit {
                    ctx.time += vehicle.shift_rest_time();
                    ctx.driving_since_rest = 0.0;
                }
            }

            // A zero-distance hop between two customers is one physical stop.
            if site == SiteType::Customer && !(dist == 0.0 && ctx.last_was_customer) {
                ctx.stops += 1;
            }

            if let Some(tw) = node.applicable_window(ctx.time) {
                quality.add_penalty(PenaltyReason::Delay, tw.delay(ctx.time));
                let wait = tw.waiting_time(ctx.time);
                if wait > 0.0 {
                    if let Some(max_wait) = vehicle.max_waiting_time() {
                        quality.add_penalty(PenaltyReason::Delay, (wait - max_wait).max(0.0));
                    }
                    ctx.time = tw.ready();
                }
            }

            match site {
                SiteType::Customer => {
                    quality.add_penalty(
                        PenaltyReason::Capacity,
                        ctx.apply_demand(node, vehicle.capacity()),
                    );
                    if !node.allows_depot(depot) {
                        quality.add_penalty(PenaltyReason::Presetting, 1.0);
                    }
                    if let Some(block) = node.block() {
                        quality.add_penalty(
                            PenaltyReason::Presetting,
                            ctx.note_block(block.block_id, block.rank, block.position, seq),
                        );
                    }
                    quality.add_penalty(PenaltyReason::Blacklist, ctx.note_seen(node));
                    ctx.time += node.service_time();
                }
                SiteType::Replenish => {
                    ctx.replenish(node);
                    ctx.time += node.service_time();
                }
                SiteType::Pause => {
                    ctx.time += node.service_time();
                }
                SiteType::Depot => {
                    if let Some(max_duration) = vehicle.max_route_duration() {
                        quality.add_penalty(
                            PenaltyReason::Duration,
                            (ctx.duration() - max_duration).max(0.0),
                        );
                    }
                    if let Some(max_stops) = vehicle.max_stop_count() {
                        if ctx.stops > max_stops {
                            quality.add_penalty(
                                PenaltyReason::StopCount,
                                (ctx.stops - max_stops) as f64,
                            );
                        }
                    }
                    quality.add_cost(ctx.length * vehicle.cost_per_distance());
                    if ctx.stops >= 1 {
                        quality.add_cost(vehicle.fixed_cost());
                    }
                }
            }

            ctx.last = id;
            ctx.last_was_customer = site == SiteType::Customer;
        }

        Ok(quality)
    }

    /// Collapses structurally redundant consecutive depot/replenish
    /// duplicates without mutating the source array.
    fn active_nodes(&self, route: &[usize]) -> Vec<usize> {
        let mut active: Vec<usize> = Vec::with_capacity(route.len());
        for &id in route {
            let site = self.model.node(id).site_type();
            if let Some(&prev) = active.last() {
                let prev_site = self.model.node(prev).site_type();
                let redundant = matches!(site, SiteType::Depot | SiteType::Replenish)
                    && site == prev_site;
                if redundant {
                    continue;
                }
            }
            active.push(id);
        }
        active
    }

    /// Solution-scope block pass: one route per block, and declared member
    /// count met for every block that is partially present.
    fn block_membership(&self, solution: &Solution) -> Quality {
        let mut quality = Quality::new();
        let mut seen: BTreeMap<usize, (BTreeSet<usize>, usize)> = BTreeMap::new();
        for (r, route) in solution.routes().iter().enumerate() {
            for &id in route {
                let node = self.model.node(id);
                if node.site_type() != SiteType::Customer {
                    continue;
                }
                if let Some(block) = node.block() {
                    let entry = seen.entry(block.block_id).or_default();
                    entry.0.insert(r);
                    entry.1 += 1;
                }
            }
        }
        for (block_id, (routes, count)) in seen {
            if routes.len() > 1 {
                quality.add_penalty(PenaltyReason::Presetting, (routes.len() - 1) as f64);
            }
            if let Some(&declared) = self.model.block_sizes().get(&block_id) {
                if count < declared {
                    quality.add_penalty(PenaltyReason::Presetting, (declared - count) as f64);
                }
            }
        }
        quality
    }

    /// Evaluates the whole solution from scratch.
    pub fn check(&self, solution: &Solution) -> Result<Quality, SolverError> {
        let mut total = Quality::new();
        for route in solution.routes() {
            total.merge(&self.evaluate_route(route)?);
        }
        total.merge(&self.block_membership(solution));
        Ok(total)
    }

    /// Evaluates the whole solution and caches every route quality on the
    /// solution for later incremental checks.
    pub fn check_and_fixate(&self, solution: &mut Solution) -> Result<Quality, SolverError> {
        let mut total = Quality::new();
        let mut per_route = Vec::with_capacity(solution.num_routes());
        for route in solution.routes() {
            let q = self.evaluate_route(route)?;
            total.merge(&q);
            per_route.push(q);
        }
        total.merge(&self.block_membership(solution));
        solution.fixate_qualities(per_route)?;
        Ok(total)
    }

    /// Evaluates the solution re-scanning only `touched` routes (and any
    /// route whose cache entry was dropped), reusing cached qualities for
    /// the rest. Fresh qualities are stored back into the cache.
    pub fn check_routes(
        &self,
        solution: &mut Solution,
        touched: &[usize],
    ) -> Result<Quality, SolverError> {
        let mut total = Quality::new();
        for idx in 0..solution.num_routes() {
            let quality = match solution.route_quality(idx) {
                Some(q) if !touched.contains(&idx) => q.clone(),
                _ => {
                    let q = self.evaluate_route(solution.route(idx))?;
                    solution.set_route_quality(idx, q.clone());
                    q
                }
            };
            total.merge(&quality);
        }
        total.merge(&self.block_membership(solution));
        Ok(total)
    }
}
