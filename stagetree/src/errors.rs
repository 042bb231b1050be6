//! Error types for stage tree execution.
//!
//! Every failure a run can produce is a [`StageError`]. Failures are
//! fail-fast: a stage either completes or reports exactly one error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The error type returned by [`Stage::run`](crate::stage::Stage::run).
#[derive(Debug, Error)]
pub enum StageError {
    /// The children of a stage declare a dependency cycle.
    #[error("dependency cycle detected in stage '{stage}': {}", path.join(" -> "))]
    CycleDetected {
        /// The stage whose children form the cycle.
        stage: String,
        /// The offending path, first element repeated at the end.
        path: Vec<String>,
    },

    /// A wave made no progress because some dependencies never complete.
    #[error("stage '{stage}' cannot make progress: {}", format_waiting(waiting))]
    DependencyUnresolved {
        /// The stage whose children stalled.
        stage: String,
        /// The children still waiting and what they wait for.
        waiting: Vec<UnresolvedDependency>,
    },

    /// The pre-hook of a stage returned an error.
    #[error("pre-hook of stage '{stage}' failed: {source}")]
    PreHook {
        /// The stage owning the hook.
        stage: String,
        /// The hook's error.
        #[source]
        source: anyhow::Error,
    },

    /// The post-hook of a stage returned an error.
    #[error("post-hook of stage '{stage}' failed: {source}")]
    PostHook {
        /// The stage owning the hook.
        stage: String,
        /// The hook's error.
        #[source]
        source: anyhow::Error,
    },

    /// A child stage failed. Displays exactly as the child's own error.
    #[error("{source}")]
    Child {
        /// The name of the failed child.
        stage: String,
        /// The child's error.
        #[source]
        source: Box<StageError>,
    },

    /// The run was cancelled at a wave checkpoint.
    #[error("stage '{stage}' cancelled: {reason}")]
    Cancelled {
        /// The stage that observed the cancellation.
        stage: String,
        /// The cancellation reason.
        reason: String,
    },

    /// The task running a concurrently dispatched child panicked or was
    /// aborted.
    #[error("task running stage '{stage}' did not complete: {message}")]
    TaskPanicked {
        /// The child whose task did not complete.
        stage: String,
        /// The join error message.
        message: String,
    },
}

/// A child that could not become ready, with the dependencies it still lacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedDependency {
    /// The waiting child.
    pub child: String,
    /// Dependencies that never completed.
    pub missing: Vec<String>,
    /// The subset of `missing` that names no sibling at all.
    pub unknown: Vec<String>,
}

fn format_waiting(waiting: &[UnresolvedDependency]) -> String {
    waiting
        .iter()
        .map(|w| format!("'{}' waits on [{}]", w.child, w.missing.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Discriminant of a [`StageError`], used in event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// See [`StageError::CycleDetected`].
    CycleDetected,
    /// See [`StageError::DependencyUnresolved`].
    DependencyUnresolved,
    /// See [`StageError::PreHook`].
    PreHook,
    /// See [`StageError::PostHook`].
    PostHook,
    /// See [`StageError::Child`].
    Child,
    /// See [`StageError::Cancelled`].
    Cancelled,
    /// See [`StageError::TaskPanicked`].
    TaskPanicked,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "cycle_detected"),
            Self::DependencyUnresolved => write!(f, "dependency_unresolved"),
            Self::PreHook => write!(f, "pre_hook"),
            Self::PostHook => write!(f, "post_hook"),
            Self::Child => write!(f, "child"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TaskPanicked => write!(f, "task_panicked"),
        }
    }
}

impl StageError {
    /// Wraps a child's error.
    #[must_use]
    pub fn child(stage: impl Into<String>, source: Self) -> Self {
        Self::Child {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Returns the kind of this error (not of its root cause).
    #[must_use]
    pub fn kind(&self) -> StageErrorKind {
        match self {
            Self::CycleDetected { .. } => StageErrorKind::CycleDetected,
            Self::DependencyUnresolved { .. } => StageErrorKind::DependencyUnresolved,
            Self::PreHook { .. } => StageErrorKind::PreHook,
            Self::PostHook { .. } => StageErrorKind::PostHook,
            Self::Child { .. } => StageErrorKind::Child,
            Self::Cancelled { .. } => StageErrorKind::Cancelled,
            Self::TaskPanicked { .. } => StageErrorKind::TaskPanicked,
        }
    }

    /// Strips every `Child` wrapper and returns the originating error.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::Child { source, .. } = current {
            current = source;
        }
        current
    }

    /// Name of the stage the originating error belongs to.
    #[must_use]
    pub fn failed_stage(&self) -> &str {
        match self.root_cause() {
            Self::CycleDetected { stage, .. }
            | Self::DependencyUnresolved { stage, .. }
            | Self::PreHook { stage, .. }
            | Self::PostHook { stage, .. }
            | Self::Child { stage, .. }
            | Self::Cancelled { stage, .. }
            | Self::TaskPanicked { stage, .. } => stage,
        }
    }

    /// Returns true when the tree itself is malformed. Retrying cannot help.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::CycleDetected { .. } | Self::DependencyUnresolved { .. }
        )
    }

    /// Returns true when the root cause is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let root = self.root_cause();
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(root.kind()));
        map.insert("stage".to_string(), serde_json::json!(root.failed_stage()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match root {
            Self::CycleDetected { path, .. } => {
                map.insert("path".to_string(), serde_json::json!(path));
            }
            Self::DependencyUnresolved { waiting, .. } => {
                map.insert("waiting".to_string(), serde_json::json!(waiting));
            }
            Self::Cancelled { reason, .. } => {
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            _ => {}
        }

        map
    }
}
