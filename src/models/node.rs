//! Node and time window types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A time window constraint for service at a node.
///
/// The vehicle must arrive no later than `due` and may arrive as early as
/// `ready` (waiting is allowed if early).
///
/// # Examples
///
/// ```
/// use fleet_routing::models::TimeWindow;
///
/// let tw = TimeWindow::new(100.0, 200.0).unwrap();
/// assert!(tw.ready() <= tw.due());
/// assert!(tw.contains(150.0));
/// assert!(!tw.contains(250.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    ready: f64,
    due: f64,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// Returns `None` if `ready > due` or either value is non-finite.
    pub fn new(ready: f64, due: f64) -> Option<Self> {
        if !ready.is_finite() || !due.is_finite() || ready > due {
            return None;
        }
        Some(Self { ready, due })
    }

    /// Earliest allowable arrival time.
    pub fn ready(&self) -> f64 {
        self.ready
    }

    /// Latest allowable arrival time.
    pub fn due(&self) -> f64 {
        self.due
    }

    /// Returns `true` if the given time falls within this window.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.ready && time <= self.due
    }

    /// Returns the waiting time if arriving at the given time.
    ///
    /// Zero if the vehicle arrives within or after the window.
    pub fn waiting_time(&self, arrival: f64) -> f64 {
        if arrival < self.ready {
            self.ready - arrival
        } else {
            0.0
        }
    }

    /// Returns the lateness if arriving at the given time.
    ///
    /// Zero if the vehicle arrives before the window closes.
    pub fn delay(&self, arrival: f64) -> f64 {
        if arrival > self.due {
            arrival - self.due
        } else {
            0.0
        }
    }
}

/// The kind of site a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteType {
    /// A depot where routes start and end.
    Depot,
    /// A customer to be served.
    Customer,
    /// A replenishment site where compartments are emptied/refilled.
    Replenish,
    /// A synthetic pause (driver break); consumes service time only.
    Pause,
}

/// Whether a node's demand is loaded onto or unloaded from the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadType {
    /// Goods are picked up at the node (load increases).
    Pickup,
    /// Goods are delivered to the node (load was on board from the depot).
    Delivery,
}

/// Preset membership of a node in an ordered block.
///
/// All members of a block must be served on one route. Within the block,
/// `rank` must never decrease along the route, and nodes carrying a
/// `position` must appear contiguously in ascending position order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier of the block this node belongs to.
    pub block_id: usize,
    /// Fixed position within the block, if declared.
    pub position: Option<usize>,
    /// Ordering rank within the block (monotonically non-decreasing).
    pub rank: i32,
}

/// A node in the routing model: depot, customer, replenishment site, or
/// synthetic pause.
///
/// Nodes are immutable once a run starts (the pre-check invalid-reason
/// annotation is the only exception). The `id` doubles as the dense index
/// into the model's node slice and metric matrix.
///
/// # Examples
///
/// ```
/// use fleet_routing::models::{LoadType, Node, SiteType, TimeWindow};
///
/// let depot = Node::depot(0, 0.0, 0.0);
/// assert_eq!(depot.site_type(), SiteType::Depot);
///
/// let c = Node::customer(1, 3.0, 4.0, vec![10.0], 5.0)
///     .with_load_type(LoadType::Pickup)
///     .with_time_window(TimeWindow::new(0.0, 100.0).unwrap());
/// assert_eq!(c.demand(), &[10.0]);
/// assert_eq!(c.time_windows().len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: usize,
    site_type: SiteType,
    x: f64,
    y: f64,
    demand: Vec<f64>,
    load_type: LoadType,
    time_windows: Vec<TimeWindow>,
    service_time: f64,
    block: Option<Block>,
    allowed_depots: BTreeSet<usize>,
    blacklist: BTreeSet<usize>,
    invalid_reason: Option<String>,
}

impl Node {
    fn new(id: usize, site_type: SiteType, x: f64, y: f64, demand: Vec<f64>, service_time: f64) -> Self {
        Self {
            id,
            site_type,
            x,
            y,
            demand,
            load_type: LoadType::Delivery,
            time_windows: Vec::new(),
            service_time,
            block: None,
            allowed_depots: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            invalid_reason: None,
        }
    }

    /// Creates a depot node (no demand).
    pub fn depot(id: usize, x: f64, y: f64) -> Self {
        Self::new(id, SiteType::Depot, x, y, Vec::new(), 0.0)
    }

    /// Creates a customer node with per-compartment demands.
    pub fn customer(id: usize, x: f64, y: f64, demand: Vec<f64>, service_time: f64) -> Self {
        Self::new(id, SiteType::Customer, x, y, demand, service_time)
    }

    /// Creates a replenishment node.
    ///
    /// The demand vector acts as a compartment mask: compartment `c` is
    /// replenished when `demand[c] != 0`, or always when the mask is empty.
    pub fn replenish(id: usize, x: f64, y: f64, mask: Vec<f64>) -> Self {
        Self::new(id, SiteType::Replenish, x, y, mask, 0.0)
    }

    /// Creates a synthetic pause node (service time only, no demand).
    pub fn pause(id: usize, x: f64, y: f64, service_time: f64) -> Self {
        Self::new(id, SiteType::Pause, x, y, Vec::new(), service_time)
    }

    /// Sets the load type (default: delivery).
    pub fn with_load_type(mut self, load_type: LoadType) -> Self {
        self.load_type = load_type;
        self
    }

    /// Adds a time window. Windows are consulted in insertion order.
    pub fn with_time_window(mut self, tw: TimeWindow) -> Self {
        self.time_windows.push(tw);
        self
    }

    /// Sets the service time. Depots and replenish sites default to zero;
    /// a depot's service time acts as loading time when the run enables
    /// depot loading.
    pub fn with_service_time(mut self, service_time: f64) -> Self {
        self.service_time = service_time;
        self
    }

    /// Sets the block preset for this node.
    pub fn with_block(mut self, block: Block) -> Self {
        self.block = Some(block);
        self
    }

    /// Restricts this node to routes starting at the given depots.
    ///
    /// An empty whitelist (the default) allows every depot.
    pub fn with_allowed_depots(mut self, depots: impl IntoIterator<Item = usize>) -> Self {
        self.allowed_depots = depots.into_iter().collect();
        self
    }

    /// Forbids this node from sharing a route with the given nodes.
    pub fn with_blacklist(mut self, nodes: impl IntoIterator<Item = usize>) -> Self {
        self.blacklist = nodes.into_iter().collect();
        self
    }

    /// Node id (== index into the model's node slice).
    pub fn id(&self) -> usize {
        self.id
    }

    /// Site type of this node.
    pub fn site_type(&self) -> SiteType {
        self.site_type
    }

    /// X-coordinate.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Y-coordinate.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Per-compartment demand vector.
    pub fn demand(&self) -> &[f64] {
        &self.demand
    }

    /// Load type of this node's demand.
    pub fn load_type(&self) -> LoadType {
        self.load_type
    }

    /// Declared time windows.
    pub fn time_windows(&self) -> &[TimeWindow] {
        &self.time_windows
    }

    /// Service time at this node.
    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    /// Block preset, if any.
    pub fn block(&self) -> Option<&Block> {
        self.block.as_ref()
    }

    /// Depot whitelist (empty = all depots allowed).
    pub fn allowed_depots(&self) -> &BTreeSet<usize> {
        &self.allowed_depots
    }

    /// Returns `true` if this node may be served from the given depot.
    pub fn allows_depot(&self, depot_id: usize) -> bool {
        self.allowed_depots.is_empty() || self.allowed_depots.contains(&depot_id)
    }

    /// Nodes this node must not share a route with.
    pub fn blacklist(&self) -> &BTreeSet<usize> {
        &self.blacklist
    }

    /// Pre-check annotation explaining why this node was ruled invalid.
    pub fn invalid_reason(&self) -> Option<&str> {
        self.invalid_reason.as_deref()
    }

    /// Annotates this node as invalid. The only mutation allowed after
    /// model construction.
    pub fn set_invalid_reason(&mut self, reason: impl Into<String>) {
        self.invalid_reason = Some(reason.into());
    }

    /// Returns the window governing an arrival at the given time: the first
    /// window that has not yet closed, or the last window if all have.
    pub fn applicable_window(&self, arrival: f64) -> Option<&TimeWindow> {
        self.time_windows
            .iter()
            .find(|tw| arrival <= tw.due())
            .or_else(|| self.time_windows.last())
    }

    /// Returns `true` if this replenishment node resets the given
    /// compartment. Always `false` for non-replenish sites.
    pub fn replenishes(&self, compartment: usize) -> bool {
        self.site_type == SiteType::Replenish
            && (self.demand.is_empty() || self.demand.get(compartment).copied().unwrap_or(0.0) != 0.0)
    }

    /// Euclidean distance to another node.
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
