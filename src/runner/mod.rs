mod hooks;
mod job;
mod state;
mod task;

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::JobExecutionError;

pub use hooks::{HookFn, JobEvent, JobHook, TaskEvent, TaskHook};
pub use job::{Job, JobParams, JobQueue, JobSnapshot, QueuedTask, StopHandle};
pub use state::TaskState;
pub use task::{Task, TaskFn, TaskParams, TaskSnapshot};

/// Await `fut`, turning a panic raised while polling it into an error.
pub(crate) async fn guarded<F: Future>(fut: F) -> Result<F::Output, JobExecutionError> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(JobExecutionError::from_panic)
}
