//! Background task state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a background task.
///
/// `Completed` is terminal; a completed task is evicted from the registry the
/// first time its result is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Registered, work not yet started.
    Pending,
    /// Work is executing.
    Running,
    /// Work finished (successfully or with an error text) and holds a result.
    Completed,
}

impl TaskState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: TaskState) -> bool {
        use TaskState::*;

        matches!(
            (self, target),
            (Pending, Running) | (Pending, Completed) | (Running, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// What a status check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Never issued, already delivered, or not a valid id.
    NotFound,
    /// Work has not finished yet.
    StillRunning,
    /// First observation of a finished task. The entry is gone afterwards.
    Ready(String),
}
