//! Lifecycle events for observing stage runs.
//!
//! Every [`ExecutionContext`](crate::context::ExecutionContext) carries an
//! [`EventSink`]. Stages report their lifecycle through it; the default sink
//! discards everything.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Emitted when a stage passes validation and starts its pre-hook.
pub const STAGE_STARTED: &str = "stage.started";
/// Emitted once per scheduling wave with the names dispatched in it.
pub const STAGE_WAVE: &str = "stage.wave";
/// Emitted when a stage completes successfully.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// Emitted when a stage fails for any reason.
pub const STAGE_FAILED: &str = "stage.failed";
