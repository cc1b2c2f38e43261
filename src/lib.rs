//! In-process sequential task orchestration.
//!
//! A [`Job`] owns an ordered [`Queue`] of [`Task`]s, each bound to the
//! arguments it was registered with. Running the job executes the tasks one
//! after another, fires lifecycle hooks around every step, collects results and
//! errors, and honours cooperative stop requests between tasks.
//!
//! ```no_run
//! use seqtask::{Job, JobExecutionError, JobHook, JobParams, Task};
//!
//! # async fn example() -> Result<(), JobExecutionError> {
//! let mut job: Job<u32> = Job::new(JobParams::named("nightly"));
//! job.add_task(Task::new(|(a, b): (u32, u32)| async move { Ok::<_, JobExecutionError>(a + b) }), (1, 2))
//!     .add_hook(JobHook::on_finish(|errors, results| async move {
//!         println!("{} errors, results {results:?}", errors.len());
//!     }));
//! job.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod queue;
pub mod runner;

pub use config::RunnerConfig;
pub use error::JobExecutionError;
pub use logger::Logger;
pub use queue::Queue;
pub use runner::{
    Job, JobEvent, JobHook, JobParams, JobSnapshot, QueuedTask, StopHandle, Task, TaskEvent,
    TaskHook, TaskParams, TaskSnapshot, TaskState,
};
