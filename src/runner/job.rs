use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::guarded;
use super::hooks::{JobEvent, JobHook, JobHooks, check_named};
use super::task::{Task, TaskSnapshot};
use crate::error::{ErrorLog, JobExecutionError};
use crate::logger::Logger;
use crate::queue::Queue;

/// A task bound to the arguments it was queued with.
///
/// This is what a job's queue holds; it hides the argument type so tasks with
/// different signatures can share one job as long as they produce the same `R`.
pub trait QueuedTask<R>: Send + Sync {
    fn name(&self) -> Option<&str>;
    fn snapshot(&self) -> TaskSnapshot;
    fn errors(&self) -> &[JobExecutionError];
    fn result(&self) -> Option<&R>;
    /// Run the task with its bound arguments.
    fn execute(&mut self) -> BoxFuture<'_, Result<Option<R>, JobExecutionError>>;
}

struct BoundTask<R, A> {
    task: Task<R, A>,
    args: A,
}

impl<R, A> QueuedTask<R> for BoundTask<R, A>
where
    R: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    fn name(&self) -> Option<&str> {
        self.task.name()
    }

    fn snapshot(&self) -> TaskSnapshot {
        self.task.snapshot()
    }

    fn errors(&self) -> &[JobExecutionError] {
        self.task.errors()
    }

    fn result(&self) -> Option<&R> {
        self.task.result()
    }

    fn execute(&mut self) -> BoxFuture<'_, Result<Option<R>, JobExecutionError>> {
        let args = self.args.clone();
        self.task.run(args).boxed()
    }
}

/// Queue type a job drains.
pub type JobQueue<R> = Queue<Box<dyn QueuedTask<R>>>;

/// Cloneable handle that asks a running job to stop after its current task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    logger: Logger,
}

impl StopHandle {
    fn new(logger: Logger) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            logger,
        }
    }

    /// Request a cooperative stop. The task in flight is never interrupted;
    /// the job checks the flag once that task has finished.
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.logger
            .log("Process queue set to stop after the current task.");
        info!("job stop requested");
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Settings a job is built from. Everything except the logger can be loaded
/// from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub queue_name: Option<String>,
    /// Accepted for compatibility; tasks always run one after another.
    #[serde(default)]
    pub exec_async: bool,
    /// Archive finished entries in the queue.
    #[serde(default = "default_keep_history")]
    pub keep_history: bool,
    #[serde(skip)]
    pub logger: Logger,
}

fn default_keep_history() -> bool {
    true
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            name: None,
            queue_name: None,
            exec_async: false,
            keep_history: default_keep_history(),
            logger: Logger::default(),
        }
    }
}

impl JobParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }
}

/// Point-in-time view of a job, handed to `beforeStart`/`afterAll` hooks.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub name: Option<String>,
    pub queue_name: Option<String>,
    pub running: bool,
    pub stop_requested: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub pending_tasks: usize,
    pub dequeued_tasks: usize,
    pub result_count: usize,
    pub error_count: usize,
    /// Lets hooks request a stop.
    #[serde(skip)]
    pub stop_handle: StopHandle,
}

/// Runs an ordered set of tasks one at a time and aggregates their outcomes.
///
/// A failing task never aborts the job: its error is collected and the next
/// task runs. The run always ends with the `afterAll` and `onFinish` hooks.
pub struct Job<R> {
    id: Uuid,
    name: Option<String>,
    exec_async: bool,
    queue: JobQueue<R>,
    hooks: JobHooks<R>,
    errors: ErrorLog,
    results: Vec<R>,
    dequeued: usize,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    running: bool,
    finished: bool,
    stop: StopHandle,
    logger: Logger,
}

impl<R> Default for Job<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(JobParams::default())
    }
}

impl<R> Job<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub fn new(params: JobParams) -> Self {
        let JobParams {
            name,
            queue_name,
            exec_async,
            keep_history,
            logger,
        } = params;
        Self {
            id: Uuid::new_v4(),
            name,
            exec_async,
            queue: Queue::with_history(queue_name, keep_history),
            hooks: JobHooks::default(),
            errors: ErrorLog::default(),
            results: Vec::new(),
            dequeued: 0,
            started_at: None,
            ended_at: None,
            stopped_at: None,
            running: false,
            finished: false,
            stop: StopHandle::new(logger.clone()),
            logger,
        }
    }

    /// Queue `task` to run with `args`.
    ///
    /// From now on every failure of the task is also recorded in this job's
    /// error list. Hooks already registered on the task are kept.
    pub fn add_task<A>(&mut self, mut task: Task<R, A>, args: A) -> &mut Self
    where
        A: Clone + Send + Sync + 'static,
    {
        debug!(job = %self.label(), task = %task.label(), "task queued");
        task.attach_job_errors(self.errors.clone());
        self.queue.push(Box::new(BoundTask { task, args }));
        self
    }

    /// Register `hook`, replacing any earlier hook for the same event.
    pub fn add_hook(&mut self, hook: JobHook<R>) -> &mut Self {
        debug!(job = %self.label(), event = %hook.event(), "job hook registered");
        self.hooks.set(hook);
        self
    }

    /// Register `hook` under a string event name; unknown or mismatched names
    /// are rejected.
    pub fn add_named_hook(
        &mut self,
        name: &str,
        hook: JobHook<R>,
    ) -> Result<&mut Self, JobExecutionError> {
        check_named(name, hook.event())?;
        Ok(self.add_hook(hook))
    }

    /// Drain the queue, running every task in order.
    ///
    /// Task failures are collected rather than returned; the only error this
    /// returns is for a job that has already run.
    pub async fn run(&mut self) -> Result<(), JobExecutionError> {
        if self.finished {
            return Err(JobExecutionError::new(format!(
                "job {} has already run",
                self.label()
            )));
        }

        let label = self.label().to_string();
        self.logger.log(&format!("[{label}] job starting..."));
        info!(job = %label, id = %self.id, tasks = self.queue.len(), "job starting");

        self.running = true;
        self.started_at = Some(Utc::now());
        let snapshot = self.snapshot();
        contain(
            &self.errors,
            &label,
            JobEvent::BeforeStart,
            self.hooks.before_start(snapshot),
        )
        .await;
        contain(&self.errors, &label, JobEvent::BeforeAll, self.hooks.before_all()).await;

        while let Some(entry) = self.queue.next() {
            self.dequeued += 1;
            let recorded = self.errors.len();

            let outcome = match guarded(self.hooks.before_each(entry.snapshot())).await {
                Ok(()) => guarded(entry.execute()).await.and_then(|run| run),
                Err(err) => Err(err),
            };

            let mut failed = false;
            match outcome {
                Ok(Some(value)) => self.results.push(value),
                Ok(None) => {
                    debug!(job = %label, task = ?entry.name(), "silent task failure collected");
                }
                Err(err) => {
                    failed = true;
                    self.stopped_at = Some(Utc::now());
                    // Tasks forward their own failures; only record what they could not.
                    if self.errors.len() == recorded {
                        self.errors.record(err.clone());
                    }
                    warn!(job = %label, task = ?entry.name(), error = %err, "task failed");
                    contain(
                        &self.errors,
                        &label,
                        JobEvent::OnError,
                        self.hooks.on_error(err),
                    )
                    .await;
                }
            }

            contain(
                &self.errors,
                &label,
                JobEvent::AfterEach,
                self.hooks.after_each(entry.snapshot()),
            )
            .await;

            if self.stop.is_stop_requested() {
                if !failed {
                    self.stopped_at = Some(Utc::now());
                }
                info!(job = %label, pending = self.queue.len(), "job stopped early");
                break;
            }
        }

        if self.errors.is_empty() {
            let results = self.results.clone();
            contain(
                &self.errors,
                &label,
                JobEvent::OnSuccess,
                self.hooks.on_success(results),
            )
            .await;
        }
        let snapshot = self.snapshot();
        contain(&self.errors, &label, JobEvent::AfterAll, self.hooks.after_all(snapshot)).await;
        let (errors, results) = (self.errors.snapshot(), self.results.clone());
        contain(
            &self.errors,
            &label,
            JobEvent::OnFinish,
            self.hooks.on_finish(errors, results),
        )
        .await;

        let ended = Utc::now();
        self.ended_at = Some(ended);
        self.running = false;
        self.finished = true;

        let started = self.started_at.unwrap_or(ended);
        match self.stopped_at {
            Some(stopped) => {
                let error_count = self.errors.len();
                self.logger.log(&format!(
                    "[{label}] stopped within {}s at {} with {error_count} errors.",
                    elapsed_secs(started, stopped),
                    stopped.to_rfc3339(),
                ));
            }
            None => {
                self.logger.log(&format!(
                    "[{label}] finished job within {}s",
                    elapsed_secs(started, ended),
                ));
            }
        }
        info!(
            job = %label,
            results = self.results.len(),
            errors = self.errors.len(),
            "job finished"
        );
        Ok(())
    }
}

impl<R> Job<R> {
    /// Ask the job to stop once the task in flight has finished.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle that can request a stop from inside tasks and hooks.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            name: self.name.clone(),
            queue_name: self.queue.name().map(str::to_string),
            running: self.running,
            stop_requested: self.stop.is_stop_requested(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            stopped_at: self.stopped_at,
            pending_tasks: self.queue.len(),
            dequeued_tasks: self.dequeued,
            result_count: self.results.len(),
            error_count: self.errors.len(),
            stop_handle: self.stop.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn exec_async(&self) -> bool {
        self.exec_async
    }

    /// Pending, current and (if kept) executed entries.
    pub fn queue(&self) -> &JobQueue<R> {
        &self.queue
    }

    pub fn has_hook(&self, event: JobEvent) -> bool {
        self.hooks.is_set(event)
    }

    pub fn registered_hooks(&self) -> Vec<JobEvent> {
        self.hooks.registered()
    }

    /// Every failure collected so far, in the order tasks failed.
    pub fn errors(&self) -> Vec<JobExecutionError> {
        self.errors.snapshot()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Results of the tasks that succeeded, in execution order.
    pub fn results(&self) -> &[R] {
        &self.results
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Set when a task failure propagated or a stop took effect; never cleared.
    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    pub fn started_at_millis(&self) -> i64 {
        self.started_at.map_or(0, |t| t.timestamp_millis())
    }

    pub fn ended_at_millis(&self) -> i64 {
        self.ended_at.map_or(0, |t| t.timestamp_millis())
    }

    pub fn stopped_at_millis(&self) -> i64 {
        self.stopped_at.map_or(0, |t| t.timestamp_millis())
    }
}

impl<R> fmt::Debug for Job<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pending", &self.queue.len())
            .field("hooks", &self.hooks.registered())
            .field("results", &self.results.len())
            .field("errors", &self.errors.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

/// Await a job hook; a panic inside it is logged and recorded as a job error.
async fn contain<F>(errors: &ErrorLog, job: &str, event: JobEvent, hook: F)
where
    F: Future<Output = ()>,
{
    if let Err(err) = guarded(hook).await {
        warn!(job = %job, event = %event, error = %err, "job hook panicked");
        errors.record(err);
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::hooks::TaskHook;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    fn push(events: &Events, entry: impl Into<String>) {
        events.lock().unwrap().push(entry.into());
    }

    fn quiet(name: &str) -> JobParams {
        JobParams::named(name).with_logger(Logger::noop())
    }

    fn value_task(name: &str, value: u32) -> Task<u32> {
        Task::new(move |()| async move { Ok::<_, JobExecutionError>(value) }).named(name)
    }

    fn failing_task(name: &str, message: &'static str) -> Task<u32> {
        Task::new(move |()| async move { Err::<u32, _>(message) }).named(name)
    }

    #[tokio::test]
    async fn hooks_fire_in_lifecycle_order() {
        let events: Events = Arc::default();
        let mut job: Job<u32> = Job::new(quiet("ordered"));

        let e = events.clone();
        job.add_hook(JobHook::before_start(move |snap: JobSnapshot| {
            push(&e, format!("beforeStart running={}", snap.running));
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::before_all(move || {
            push(&e, "beforeAll");
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::before_each(move |t: TaskSnapshot| {
            push(&e, format!("beforeEach {}", t.name.unwrap_or_default()));
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::after_each(move |t: TaskSnapshot| {
            push(&e, format!("afterEach {} {}", t.name.unwrap_or_default(), t.state));
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::on_success(move |results: Vec<u32>| {
            push(&e, format!("onSuccess {results:?}"));
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::after_all(move |snap: JobSnapshot| {
            push(&e, format!("afterAll dequeued={}", snap.dequeued_tasks));
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::on_finish(move |errors, results: Vec<u32>| {
            push(&e, format!("onFinish {} {results:?}", errors.len()));
            async {}
        }));

        let mut first = value_task("a", 1);
        let e = events.clone();
        first.add_hook(TaskHook::on_finish(move || {
            push(&e, "task a onFinish");
            async {}
        }));
        job.add_task(first, ()).add_task(value_task("b", 2), ());

        job.run().await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "beforeStart running=true",
                "beforeAll",
                "beforeEach a",
                "task a onFinish",
                "afterEach a FINISHED",
                "beforeEach b",
                "afterEach b FINISHED",
                "onSuccess [1, 2]",
                "afterAll dequeued=2",
                "onFinish 0 [1, 2]",
            ]
        );
        assert!(!job.is_running());
        assert!(job.stopped_at().is_none());
        assert!(job.ended_at().unwrap() >= job.started_at().unwrap());
    }

    #[tokio::test]
    async fn propagated_failure_is_recorded_once() {
        let on_error_calls = Arc::new(Mutex::new(0));
        let mut job: Job<u32> = Job::new(quiet("once"));
        let calls = on_error_calls.clone();
        job.add_hook(JobHook::on_error(move |_| {
            *calls.lock().unwrap() += 1;
            async {}
        }));
        job.add_task(failing_task("bad", "nope"), ());

        job.run().await.unwrap();

        assert_eq!(job.error_count(), 1);
        assert_eq!(job.errors()[0].message(), "nope");
        assert_eq!(*on_error_calls.lock().unwrap(), 1);
        assert!(job.stopped_at().is_some());
    }

    #[tokio::test]
    async fn silent_failure_is_collected_without_job_on_error() {
        let on_error_calls = Arc::new(Mutex::new(0));
        let mut job: Job<u32> = Job::new(quiet("silent"));
        let calls = on_error_calls.clone();
        job.add_hook(JobHook::on_error(move |_| {
            *calls.lock().unwrap() += 1;
            async {}
        }));
        job.add_task(failing_task("quiet", "ignored").silent(true), ())
            .add_task(value_task("ok", 5), ());

        job.run().await.unwrap();

        assert_eq!(job.results(), &[5]);
        assert_eq!(job.error_count(), 1);
        assert_eq!(*on_error_calls.lock().unwrap(), 0);
        assert!(job.stopped_at().is_none());
    }

    #[tokio::test]
    async fn task_on_error_hook_survives_registration() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut task = failing_task("watched", "broken pipe");
        let s = seen.clone();
        task.add_hook(TaskHook::on_error(move |err: JobExecutionError| {
            s.lock().unwrap().push(err.to_string());
            async {}
        }));

        let mut job: Job<u32> = Job::new(quiet("forwarding"));
        job.add_task(task, ());
        job.run().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["broken pipe"]);
        assert_eq!(job.error_count(), 1);
    }

    #[tokio::test]
    async fn panicking_before_each_is_recorded_and_task_skipped() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = Task::new(move |()| {
            flag.store(true, Ordering::SeqCst);
            async { Ok::<_, JobExecutionError>(1_u32) }
        });

        let mut job: Job<u32> = Job::new(quiet("guarded"));
        job.add_hook(JobHook::before_each(|t: TaskSnapshot| async move {
            assert!(t.name.is_some(), "task needs a name");
        }));
        job.add_task(task, ());
        job.run().await.unwrap();

        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(job.error_count(), 1);
        assert!(job.errors()[0].message().contains("task needs a name"));
        assert!(job.results().is_empty());
    }

    #[tokio::test]
    async fn panicking_task_finish_hook_does_not_abort_batch() {
        let healthy = false;
        let mut first = value_task("first", 1);
        first.add_hook(TaskHook::on_finish(move || async move {
            assert!(healthy, "cleanup broke");
        }));

        let events: Events = Arc::default();
        let mut job: Job<u32> = Job::new(quiet("resilient"));
        let e = events.clone();
        job.add_hook(JobHook::on_error(move |err: JobExecutionError| {
            push(&e, format!("onError {}", err.message().contains("cleanup broke")));
            async {}
        }));
        let e = events.clone();
        job.add_hook(JobHook::on_finish(move |errors, results: Vec<u32>| {
            push(&e, format!("onFinish {} {results:?}", errors.len()));
            async {}
        }));
        job.add_task(first, ()).add_task(value_task("second", 2), ());

        job.run().await.unwrap();

        assert_eq!(job.results(), &[2]);
        assert_eq!(job.error_count(), 1);
        assert!(!job.is_running());
        assert!(job.ended_at().is_some());
        assert_eq!(*events.lock().unwrap(), vec!["onError true", "onFinish 1 [2]"]);
    }

    #[tokio::test]
    async fn panicking_job_hook_is_recorded_and_run_completes() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let mut job: Job<u32> = Job::new(quiet("noisy"));
        job.add_hook(JobHook::after_each(|t: TaskSnapshot| async move {
            assert!(t.name.is_none(), "observer broke");
        }))
        .add_hook(JobHook::on_finish(move |_, _| {
            flag.store(true, Ordering::SeqCst);
            async {}
        }));
        job.add_task(value_task("a", 1), ()).add_task(value_task("b", 2), ());

        job.run().await.unwrap();

        assert_eq!(job.results(), &[1, 2]);
        assert_eq!(job.error_count(), 2);
        assert!(job.errors()[0].message().contains("observer broke"));
        assert!(finished.load(Ordering::SeqCst));
        assert!(!job.is_running());
    }

    #[tokio::test]
    async fn stop_from_after_each_leaves_rest_queued() {
        let mut job: Job<u32> = Job::new(quiet("halting"));
        let handle = job.stop_handle();
        job.add_hook(JobHook::after_each(move |t: TaskSnapshot| {
            if t.name.as_deref() == Some("second") {
                handle.stop();
            }
            async {}
        }));
        for (i, name) in ["first", "second", "third", "fourth"].into_iter().enumerate() {
            job.add_task(value_task(name, i as u32), ());
        }

        job.run().await.unwrap();

        assert_eq!(job.results(), &[0, 1]);
        assert_eq!(job.queue().len(), 2);
        assert!(job.is_stop_requested());
        assert!(job.stopped_at().unwrap() >= job.started_at().unwrap());
        assert_eq!(job.snapshot().dequeued_tasks, 2);
    }

    #[tokio::test]
    async fn rerun_is_rejected_without_firing_hooks() {
        let finishes = Arc::new(Mutex::new(0));
        let mut job: Job<u32> = Job::new(quiet("single"));
        let f = finishes.clone();
        job.add_hook(JobHook::on_finish(move |_, _| {
            *f.lock().unwrap() += 1;
            async {}
        }));
        job.add_task(value_task("only", 1), ());

        job.run().await.unwrap();
        let err = job.run().await.unwrap_err();

        assert_eq!(err.message(), "job single has already run");
        assert_eq!(*finishes.lock().unwrap(), 1);
        assert_eq!(job.results(), &[1]);
    }

    #[tokio::test]
    async fn status_lines_go_to_the_logger() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = Logger::new(move |line| sink.lock().unwrap().push(line.to_string()));
        let mut job: Job<u32> = Job::new(JobParams::named("report").with_logger(logger));
        job.add_task(value_task("a", 1), ());

        job.run().await.unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "[report] job starting...");
        assert!(lines[1].starts_with("[report] finished job within "));
    }

    #[tokio::test]
    async fn stopped_status_line_reports_error_count() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = Logger::new(move |line| sink.lock().unwrap().push(line.to_string()));
        let mut job: Job<u32> = Job::new(JobParams::default().with_logger(logger));
        job.add_task(failing_task("x", "bad input"), ());

        job.run().await.unwrap();

        let last = lines.lock().unwrap().last().cloned().unwrap();
        assert!(last.starts_with("[anonymous] stopped within "));
        assert!(last.ends_with("with 1 errors."));
    }

    #[tokio::test]
    async fn history_can_be_disabled() {
        let params = JobParams {
            keep_history: false,
            queue_name: Some("scratch".into()),
            ..quiet("no-history")
        };
        let mut job: Job<u32> = Job::new(params);
        job.add_task(value_task("a", 1), ()).add_task(value_task("b", 2), ());

        job.run().await.unwrap();

        assert!(job.queue().executed().is_empty());
        assert_eq!(job.queue().current().and_then(|t| t.name()), Some("b"));
        assert_eq!(job.queue().name(), Some("scratch"));
    }

    #[tokio::test]
    async fn executed_entries_expose_task_state() {
        let mut job: Job<u32> = Job::new(quiet("inspect"));
        job.add_task(value_task("a", 10), ())
            .add_task(failing_task("b", "oops").silent(true), ());

        job.run().await.unwrap();

        let executed = job.queue().executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].result(), Some(&10));
        let current = job.queue().current().unwrap();
        assert_eq!(current.errors().len(), 1);
        assert_eq!(current.snapshot().error_count, 1);
    }

    #[test]
    fn named_job_hooks_are_validated() {
        let mut job: Job<u32> = Job::new(quiet("named"));
        assert!(job.add_named_hook("beforeClose", JobHook::before_close(|| async {})).is_ok());
        assert!(job.add_named_hook("after_close", JobHook::after_close(|| async {})).is_ok());

        let err = job
            .add_named_hook("afterEverything", JobHook::after_close(|| async {}))
            .unwrap_err();
        assert_eq!(err.message(), "unknown job hook 'afterEverything'");
        assert!(job.add_named_hook("onError", JobHook::before_all(|| async {})).is_err());

        assert_eq!(
            job.registered_hooks(),
            vec![JobEvent::BeforeClose, JobEvent::AfterClose]
        );
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: JobParams = serde_json::from_str(r#"{"name":"nightly"}"#).unwrap();
        assert_eq!(params.name.as_deref(), Some("nightly"));
        assert!(params.keep_history);
        assert!(!params.exec_async);

        let job: Job<()> = Job::new(params);
        assert!(!job.exec_async());
        assert_eq!(job.started_at_millis(), 0);
        assert!(format!("{job:?}").contains("nightly"));
    }
}
