use std::any::Any;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Shared handle to the original failure behind a [`JobExecutionError`].
pub type ErrorCause = Arc<dyn StdError + Send + Sync + 'static>;

/// The single error currency of tasks and jobs.
///
/// Every failure observed while running a task (an `Err` from the task
/// function, a panic in the function or one of its hooks) is wrapped into this
/// type exactly once, at the point where it is first observed. The value is
/// immutable afterwards; cloning it shares the original cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct JobExecutionError {
    message: String,
    #[source]
    cause: Option<ErrorCause>,
}

impl JobExecutionError {
    /// Build an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Build an error with a custom message that keeps `cause` as its source.
    pub fn with_cause(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Wrap an arbitrary error, reusing its `Display` output as the message.
    pub fn from_error(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: cause.to_string(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Wrap the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(format!("panicked: {detail}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original failure, if this error was built from one.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl From<anyhow::Error> for JobExecutionError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();
        let cause: Box<dyn StdError + Send + Sync + 'static> = err.into();
        Self {
            message,
            cause: Some(Arc::from(cause)),
        }
    }
}

impl From<std::io::Error> for JobExecutionError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<String> for JobExecutionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for JobExecutionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Error list shared between a job and the tasks it owns.
///
/// The job hands a clone to every task it queues; a failing task appends to it
/// before its own `onError` hook runs. The lock is never held across an await.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorLog {
    entries: Arc<Mutex<Vec<JobExecutionError>>>,
}

impl ErrorLog {
    pub(crate) fn record(&self, err: JobExecutionError) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn snapshot(&self) -> Vec<JobExecutionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
