//! Stage lifecycle states.

use crate::errors::StageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a stage is in a single run.
///
/// ```text
/// Constructed -> Validating -> PreHookRunning -> ChildrenRunning -> PostHookRunning -> Completed
///                     |              |                 |                  |
///                CycleError    PreHookError   ChildError | Cancelled   PostHookError
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Built, not yet running.
    #[default]
    Constructed,
    /// Checking the children graph for cycles.
    Validating,
    /// Running the pre-hook.
    PreHookRunning,
    /// Scheduling children wave by wave.
    ChildrenRunning,
    /// Running the post-hook.
    PostHookRunning,
    /// Finished successfully.
    Completed,
    /// The children graph has a cycle.
    CycleError,
    /// The pre-hook failed.
    PreHookError,
    /// A child failed or the children could not be scheduled.
    ChildError,
    /// Cancellation was observed between waves.
    Cancelled,
    /// The post-hook failed.
    PostHookError,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructed => write!(f, "constructed"),
            Self::Validating => write!(f, "validating"),
            Self::PreHookRunning => write!(f, "pre_hook_running"),
            Self::ChildrenRunning => write!(f, "children_running"),
            Self::PostHookRunning => write!(f, "post_hook_running"),
            Self::Completed => write!(f, "completed"),
            Self::CycleError => write!(f, "cycle_error"),
            Self::PreHookError => write!(f, "pre_hook_error"),
            Self::ChildError => write!(f, "child_error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::PostHookError => write!(f, "post_hook_error"),
        }
    }
}

impl StageState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::CycleError
                | Self::PreHookError
                | Self::ChildError
                | Self::Cancelled
                | Self::PostHookError
        )
    }

    /// Returns true if the state is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != Self::Completed
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (*self, next),
            (Self::Constructed, Self::Validating)
                | (Self::Validating, Self::CycleError | Self::PreHookRunning)
                | (Self::PreHookRunning, Self::PreHookError | Self::ChildrenRunning)
                | (
                    Self::ChildrenRunning,
                    Self::ChildError | Self::Cancelled | Self::PostHookRunning
                )
                | (Self::PostHookRunning, Self::PostHookError | Self::Completed)
        )
    }

    /// The terminal state a stage in `self` reaches when it fails with `err`.
    #[must_use]
    pub fn failed_with(self, err: &StageError) -> Self {
        match (self, err) {
            (Self::Validating, _) => Self::CycleError,
            (Self::PreHookRunning, _) => Self::PreHookError,
            (Self::ChildrenRunning, StageError::Cancelled { .. }) => Self::Cancelled,
            (Self::ChildrenRunning, _) => Self::ChildError,
            (Self::PostHookRunning, _) => Self::PostHookError,
            (state, _) => state,
        }
    }
}
