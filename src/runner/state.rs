use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle states of a single task run.
///
/// Each run flows through: IDLE → RUNNING → SUCCEEDED | FAILED → FINISHED.
/// A finished task may be run again, which re-enters RUNNING.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Finished,
}

impl TaskState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Idle, TaskState::Running)
                | (TaskState::Finished, TaskState::Running)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
                | (TaskState::Succeeded, TaskState::Finished)
                | (TaskState::Failed, TaskState::Finished)
        )
    }

    /// Terminal for the current run; the next call to `run` starts over.
    pub fn is_terminal(self) -> bool {
        self == TaskState::Finished
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Idle => write!(f, "IDLE"),
            TaskState::Running => write!(f, "RUNNING"),
            TaskState::Succeeded => write!(f, "SUCCEEDED"),
            TaskState::Failed => write!(f, "FAILED"),
            TaskState::Finished => write!(f, "FINISHED"),
        }
    }
}
