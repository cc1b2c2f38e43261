use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::guarded;
use super::hooks::{TaskEvent, TaskHook, TaskHooks, check_named};
use super::state::TaskState;
use crate::error::{ErrorLog, JobExecutionError};

/// Type-erased task function: takes the bound argument tuple, yields the result.
pub type TaskFn<R, A> =
    Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, JobExecutionError>> + Send + Sync>;

/// Optional settings applied when a task is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    #[serde(default)]
    pub name: Option<String>,
    /// Swallow failures instead of returning them from [`Task::run`].
    #[serde(default)]
    pub silent: bool,
}

/// Point-in-time view of a task, handed to hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub name: Option<String>,
    pub silent: bool,
    pub state: TaskState,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub error_count: usize,
    pub has_result: bool,
}

/// A single unit of work: an async function plus its lifecycle hooks.
///
/// `R` is the value the function produces and `A` the argument tuple it takes.
/// A task records every failure it sees and the result of its latest
/// successful run. Cloning a task copies its function, hooks and recorded
/// state, but not its link to a job.
pub struct Task<R, A = ()> {
    name: Option<String>,
    silent: bool,
    func: TaskFn<R, A>,
    hooks: TaskHooks<R>,
    job_errors: Option<ErrorLog>,
    state: TaskState,
    transitions: Vec<TaskState>,
    running: bool,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    errors: Vec<JobExecutionError>,
    result: Option<R>,
}

impl<R, A> Task<R, A>
where
    R: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    pub fn new<F, Fut, E>(func: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        E: Into<JobExecutionError> + 'static,
    {
        Self::with_params(func, TaskParams::default())
    }

    pub fn with_params<F, Fut, E>(func: F, params: TaskParams) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        E: Into<JobExecutionError> + 'static,
    {
        let func: TaskFn<R, A> = Arc::new(move |args: A| {
            let call = func(args);
            async move { call.await.map_err(Into::into) }.boxed()
        });
        Self {
            name: params.name,
            silent: params.silent,
            func,
            hooks: TaskHooks::default(),
            job_errors: None,
            state: TaskState::Idle,
            transitions: Vec::new(),
            running: false,
            started_at: None,
            ended_at: None,
            stopped_at: None,
            errors: Vec::new(),
            result: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Register `hook`, replacing any earlier hook for the same event.
    pub fn add_hook(&mut self, hook: TaskHook<R>) -> &mut Self {
        debug!(task = %self.label(), event = %hook.event(), "task hook registered");
        self.hooks.set(hook);
        self
    }

    /// Register `hook` under a string event name.
    ///
    /// Fails if `name` is not a task event, or names a different event than
    /// the one `hook` was built for.
    pub fn add_named_hook(
        &mut self,
        name: &str,
        hook: TaskHook<R>,
    ) -> Result<&mut Self, JobExecutionError> {
        check_named(name, hook.event())?;
        Ok(self.add_hook(hook))
    }

    /// Run the task function with `args`, dispatching hooks around it.
    ///
    /// Hook order is `beforeStart`, the function, then `onSuccess` or
    /// `onError`, and finally `onFinish`, which runs whatever the outcome.
    /// A panic in `onSuccess` discards the value and makes the run a failure.
    /// A panic in `onError` or `onFinish` is recorded as one more failure and
    /// becomes the outcome of the run.
    /// A failure is returned as `Err` unless the task is silent, in which case
    /// the run yields `Ok(None)`.
    pub async fn run(&mut self, args: A) -> Result<Option<R>, JobExecutionError> {
        self.result = None;
        self.ended_at = None;
        self.transitions.clear();
        self.running = true;
        self.started_at = Some(Utc::now());
        self.enter(TaskState::Running);

        let outcome = match self.invoke(args).await {
            Ok(value) => guarded(self.hooks.on_success(value.clone()))
                .await
                .map(|()| value),
            Err(err) => Err(err),
        };

        let outcome = match outcome {
            Ok(value) => {
                self.result = Some(value.clone());
                self.ended_at = Some(Utc::now());
                self.enter(TaskState::Succeeded);
                Ok(value)
            }
            Err(err) => {
                self.record_failure(err.clone());
                let hook = guarded(self.hooks.on_error(err.clone())).await;
                self.enter(TaskState::Failed);
                match hook {
                    Ok(()) => Err(err),
                    Err(hook_err) => {
                        self.record_failure(hook_err.clone());
                        Err(hook_err)
                    }
                }
            }
        };

        self.running = false;
        self.stopped_at = Some(Utc::now());
        let outcome = match guarded(self.hooks.on_finish()).await {
            Ok(()) => outcome,
            Err(hook_err) => {
                self.result = None;
                self.ended_at = None;
                self.record_failure(hook_err.clone());
                Err(hook_err)
            }
        };
        self.enter(TaskState::Finished);

        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(_) if self.silent => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn record_failure(&mut self, err: JobExecutionError) {
        warn!(task = %self.label(), error = %err, silent = self.silent, "task failed");
        if let Some(job_errors) = &self.job_errors {
            job_errors.record(err.clone());
        }
        self.errors.push(err);
    }

    async fn invoke(&self, args: A) -> Result<R, JobExecutionError> {
        guarded(self.hooks.before_start(self.snapshot())).await?;
        guarded((self.func)(args)).await?
    }
}

impl<R, A> Task<R, A> {
    fn enter(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid task transition {} -> {next}",
            self.state
        );
        debug!(task = %self.label(), from = %self.state, to = %next, "task transition");
        self.state = next;
        self.transitions.push(next);
    }

    /// Route future failures into a job's error list as well.
    pub(crate) fn attach_job_errors(&mut self, errors: ErrorLog) {
        self.job_errors = Some(errors);
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            name: self.name.clone(),
            silent: self.silent,
            state: self.state,
            running: self.running,
            started_at: self.started_at,
            ended_at: self.ended_at,
            stopped_at: self.stopped_at,
            error_count: self.errors.len(),
            has_result: self.result.is_some(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn has_hook(&self, event: TaskEvent) -> bool {
        self.hooks.is_set(event)
    }

    pub fn registered_hooks(&self) -> Vec<TaskEvent> {
        self.hooks.registered()
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// States entered during the latest run, in order.
    pub fn transitions(&self) -> &[TaskState] {
        &self.transitions
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Set only when the latest run succeeded.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Set after every run, whatever the outcome.
    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    /// Epoch milliseconds of [`Task::started_at`], `0` before the first run.
    pub fn started_at_millis(&self) -> i64 {
        self.started_at.map_or(0, |t| t.timestamp_millis())
    }

    pub fn ended_at_millis(&self) -> i64 {
        self.ended_at.map_or(0, |t| t.timestamp_millis())
    }

    pub fn stopped_at_millis(&self) -> i64 {
        self.stopped_at.map_or(0, |t| t.timestamp_millis())
    }

    /// Every failure recorded across all runs of this task.
    pub fn errors(&self) -> &[JobExecutionError] {
        &self.errors
    }

    /// The value produced by the latest run, if it succeeded.
    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }
}

impl<R: Clone, A> Clone for Task<R, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            silent: self.silent,
            func: self.func.clone(),
            hooks: self.hooks.clone(),
            job_errors: None,
            state: self.state,
            transitions: self.transitions.clone(),
            running: self.running,
            started_at: self.started_at,
            ended_at: self.ended_at,
            stopped_at: self.stopped_at,
            errors: self.errors.clone(),
            result: self.result.clone(),
        }
    }
}

impl<R, A> fmt::Debug for Task<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("silent", &self.silent)
            .field("state", &self.state)
            .field("hooks", &self.hooks.registered())
            .field("errors", &self.errors.len())
            .field("has_result", &self.result.is_some())
            .finish_non_exhaustive()
    }
}
