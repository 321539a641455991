//! Solution: an ordered collection of routes over the node arena.

use std::collections::BTreeSet;

use crate::error::SolverError;
use crate::models::Quality;

/// A route plan: ordered routes of node ids, each bounded by depot ids.
///
/// Routes own plain id sequences into the model's node arena, so copying a
/// solution never aliases mutable state. A per-route [`Quality`] cache
/// supports incremental re-evaluation; any structural mutation of a route
/// drops that route's cache entry.
///
/// # Examples
///
/// ```
/// use fleet_routing::models::Solution;
///
/// // depot ids: {0}
/// let mut sol = Solution::new([0]);
/// sol.add_route(vec![0, 1, 2, 0]).unwrap();
/// assert_eq!(sol.num_routes(), 1);
/// assert!(sol.add_route(vec![1, 2]).is_err()); // no depot bookends
/// ```
#[derive(Debug, Clone)]
pub struct Solution {
    routes: Vec<Vec<usize>>,
    qualities: Vec<Option<Quality>>,
    depots: BTreeSet<usize>,
}

impl Solution {
    /// Creates an empty solution for the given depot id set.
    pub fn new(depots: impl IntoIterator<Item = usize>) -> Self {
        Self {
            routes: Vec::new(),
            qualities: Vec::new(),
            depots: depots.into_iter().collect(),
        }
    }

    /// Returns `true` if the given node id is a depot of this solution.
    pub fn is_depot(&self, id: usize) -> bool {
        self.depots.contains(&id)
    }

    /// Depot ids this solution was created with.
    pub fn depots(&self) -> &BTreeSet<usize> {
        &self.depots
    }

    /// Appends a route. The first and last id must be depot ids.
    pub fn add_route(&mut self, nodes: Vec<usize>) -> Result<(), SolverError> {
        self.check_bookends(&nodes)?;
        self.routes.push(nodes);
        self.qualities.push(None);
        Ok(())
    }

    /// Replaces the route at `idx` (used for fast rollback). Drops the
    /// route's cached quality.
    pub fn set_route(&mut self, idx: usize, nodes: Vec<usize>) -> Result<(), SolverError> {
        self.check_bookends(&nodes)?;
        if idx >= self.routes.len() {
            return Err(SolverError::illegal_state(format!(
                "route index {idx} out of range ({} routes)",
                self.routes.len()
            )));
        }
        self.routes[idx] = nodes;
        self.qualities[idx] = None;
        Ok(())
    }

    fn check_bookends(&self, nodes: &[usize]) -> Result<(), SolverError> {
        let (first, last) = match (nodes.first(), nodes.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return Err(SolverError::illegal_state("route must not be empty")),
        };
        if !self.is_depot(first) || !self.is_depot(last) {
            return Err(SolverError::illegal_state(format!(
                "route must start and end at a depot (got {first}..{last})"
            )));
        }
        Ok(())
    }

    /// The routes of this solution.
    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    /// One route by index.
    pub fn route(&self, idx: usize) -> &[usize] {
        &self.routes[idx]
    }

    /// Number of routes (including empty depot-only ones).
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Number of non-depot entries across all routes.
    pub fn num_served(&self) -> usize {
        self.routes
            .iter()
            .map(|r| r.iter().filter(|&&id| !self.is_depot(id)).count())
            .sum()
    }

    /// Removes the node at `pos` in route `route`, returning its id.
    ///
    /// Move-layer primitive: the bookend invariant may be transiently
    /// violated between a removal and the matching insertion.
    pub fn remove_at(&mut self, route: usize, pos: usize) -> usize {
        self.qualities[route] = None;
        self.routes[route].remove(pos)
    }

    /// Inserts `id` at `pos` in route `route`. Move-layer primitive.
    pub fn insert_at(&mut self, route: usize, pos: usize, id: usize) {
        self.qualities[route] = None;
        self.routes[route].insert(pos, id);
    }

    /// Removes `len` consecutive nodes starting at `pos`. Move-layer
    /// primitive.
    pub fn splice_out(&mut self, route: usize, pos: usize, len: usize) -> Vec<usize> {
        self.qualities[route] = None;
        self.routes[route].drain(pos..pos + len).collect()
    }

    /// Inserts a segment at `pos`. Move-layer primitive.
    pub fn splice_in(&mut self, route: usize, pos: usize, segment: &[usize]) {
        self.qualities[route] = None;
        let r = &mut self.routes[route];
        for (i, &id) in segment.iter().enumerate() {
            r.insert(pos + i, id);
        }
    }

    /// A deep copy for speculative mutation. Never aliases the original's
    /// route arrays.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// The flattened giant-route view: all routes concatenated, delimited
    /// by their depot bookends.
    pub fn giant_route(&self) -> Vec<usize> {
        self.routes.iter().flatten().copied().collect()
    }

    /// Maps a giant-route index back to `(route, position)`.
    ///
    /// Returns `None` if the index is out of range.
    pub fn locate_giant(&self, giant_idx: usize) -> Option<(usize, usize)> {
        let mut offset = 0;
        for (r, route) in self.routes.iter().enumerate() {
            if giant_idx < offset + route.len() {
                return Some((r, giant_idx - offset));
            }
            offset += route.len();
        }
        None
    }

    /// Caches the per-route qualities last computed by the evaluator.
    ///
    /// Fails if the number of qualities does not match the route count.
    pub fn fixate_qualities(&mut self, qualities: Vec<Quality>) -> Result<(), SolverError> {
        if qualities.len() != self.routes.len() {
            return Err(SolverError::illegal_state(format!(
                "{} qualities for {} routes",
                qualities.len(),
                self.routes.len()
            )));
        }
        self.qualities = qualities.into_iter().map(Some).collect();
        Ok(())
    }

    /// Drops all cached route qualities.
    pub fn reset_qualities(&mut self) {
        for q in &mut self.qualities {
            *q = None;
        }
    }

    /// Cached quality of one route, if still valid.
    pub fn route_quality(&self, idx: usize) -> Option<&Quality> {
        self.qualities.get(idx).and_then(|q| q.as_ref())
    }

    /// Stores the quality of one route (after an accepted move).
    pub fn set_route_quality(&mut self, idx: usize, quality: Quality) {
        self.qualities[idx] = Some(quality);
    }

    /// Prunes routes that serve no node (depot bookends only).
    ///
    /// External normalization pass; empty routes are legal in between.
    pub fn remove_empty_routes(&mut self) {
        let keep: Vec<bool> = self
            .routes
            .iter()
            .map(|r| r.iter().any(|&id| !self.is_depot(id)))
            .collect();
        let mut i = 0;
        self.routes.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        let mut i = 0;
        self.qualities.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }
}
