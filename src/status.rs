//! One-way status event channel.
//!
//! The engine reports progress through a [`StatusSink`]: a fire-and-forget
//! sink that never blocks and never returns data. The default sink forwards
//! events to [`tracing`]; tests typically use [`CollectingStatus`].

use std::sync::Mutex;

/// Lifecycle codes reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// The run is in progress.
    Running,
    /// A recoverable exception was skipped (e.g., an unsupported operator).
    Exception,
    /// The run was aborted due to invalid input.
    Abort,
    /// The run completed.
    Finished,
}

/// A one-way event sink for engine status messages.
pub trait StatusSink {
    /// Delivers a status event. Must not block.
    fn update(&self, code: StatusCode, message: &str);
}

/// Forwards status events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn update(&self, code: StatusCode, message: &str) {
        match code {
            StatusCode::Running => tracing::debug!(target: "fleet_routing", "{message}"),
            StatusCode::Exception => tracing::warn!(target: "fleet_routing", "{message}"),
            StatusCode::Abort => tracing::error!(target: "fleet_routing", "{message}"),
            StatusCode::Finished => tracing::info!(target: "fleet_routing", "{message}"),
        }
    }
}

/// Records status events in memory.
///
/// # Examples
///
/// ```
/// use fleet_routing::status::{CollectingStatus, StatusCode, StatusSink};
///
/// let sink = CollectingStatus::default();
/// sink.update(StatusCode::Running, "iteration 1");
/// assert_eq!(sink.events().len(), 1);
/// assert_eq!(sink.events()[0].0, StatusCode::Running);
/// ```
#[derive(Debug, Default)]
pub struct CollectingStatus {
    events: Mutex<Vec<(StatusCode, String)>>,
}

impl CollectingStatus {
    /// Returns a copy of all recorded events.
    pub fn events(&self) -> Vec<(StatusCode, String)> {
        self.events.lock().expect("status mutex poisoned").clone()
    }
}

impl StatusSink for CollectingStatus {
    fn update(&self, code: StatusCode, message: &str) {
        self.events
            .lock()
            .expect("status mutex poisoned")
            .push((code, message.to_string()));
    }
}
