//! Lifecycle hook tables for tasks and jobs.
//!
//! Each lifecycle point is an enumerated event ([`TaskEvent`], [`JobEvent`])
//! with exactly one optional handler slot. Registering a handler for an event
//! replaces whatever was there before. Handlers are async closures; every
//! argument is passed by value so the returned future can be `'static`.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::job::JobSnapshot;
use super::task::TaskSnapshot;
use crate::error::JobExecutionError;

/// Type-erased async hook handler.
pub type HookFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

fn hook_fn<T, F, Fut>(f: F) -> HookFn<T>
where
    T: 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |arg: T| f(arg).boxed())
}

/// Resolve a string hook name and check it against the handler's event.
pub(crate) fn check_named<E>(name: &str, actual: E) -> Result<(), JobExecutionError>
where
    E: FromStr<Err = JobExecutionError> + PartialEq + fmt::Display,
{
    let expected: E = name.parse()?;
    if expected != actual {
        return Err(JobExecutionError::new(format!(
            "hook '{name}' was given a handler for '{actual}'"
        )));
    }
    Ok(())
}

// --- Task hooks ---

/// Lifecycle points of a single task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskEvent {
    BeforeStart,
    OnSuccess,
    OnError,
    OnFinish,
}

impl TaskEvent {
    pub const ALL: [TaskEvent; 4] = [
        TaskEvent::BeforeStart,
        TaskEvent::OnSuccess,
        TaskEvent::OnError,
        TaskEvent::OnFinish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskEvent::BeforeStart => "beforeStart",
            TaskEvent::OnSuccess => "onSuccess",
            TaskEvent::OnError => "onError",
            TaskEvent::OnFinish => "onFinish",
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskEvent {
    type Err = JobExecutionError;

    /// Accepts both `beforeStart` and `before_start` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beforeStart" | "before_start" => Ok(TaskEvent::BeforeStart),
            "onSuccess" | "on_success" => Ok(TaskEvent::OnSuccess),
            "onError" | "on_error" => Ok(TaskEvent::OnError),
            "onFinish" | "on_finish" => Ok(TaskEvent::OnFinish),
            other => Err(JobExecutionError::new(format!(
                "unknown task hook '{other}'"
            ))),
        }
    }
}

/// A handler bound to one [`TaskEvent`].
pub enum TaskHook<R> {
    /// Receives a snapshot of the task just before its function is called.
    BeforeStart(HookFn<TaskSnapshot>),
    /// Receives the value the task function produced.
    OnSuccess(HookFn<R>),
    /// Receives the wrapped failure.
    OnError(HookFn<JobExecutionError>),
    /// Runs after every attempt, whatever the outcome.
    OnFinish(HookFn<()>),
}

impl<R: 'static> TaskHook<R> {
    pub fn before_start<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        TaskHook::BeforeStart(hook_fn(f))
    }

    pub fn on_success<F, Fut>(f: F) -> Self
    where
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        TaskHook::OnSuccess(hook_fn(f))
    }

    pub fn on_error<F, Fut>(f: F) -> Self
    where
        F: Fn(JobExecutionError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        TaskHook::OnError(hook_fn(f))
    }

    pub fn on_finish<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        TaskHook::OnFinish(hook_fn(move |_: ()| f()))
    }
}

impl<R> TaskHook<R> {
    pub fn event(&self) -> TaskEvent {
        match self {
            TaskHook::BeforeStart(_) => TaskEvent::BeforeStart,
            TaskHook::OnSuccess(_) => TaskEvent::OnSuccess,
            TaskHook::OnError(_) => TaskEvent::OnError,
            TaskHook::OnFinish(_) => TaskEvent::OnFinish,
        }
    }
}

impl<R> fmt::Debug for TaskHook<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskHook").field(&self.event()).finish()
    }
}

pub(crate) struct TaskHooks<R> {
    before_start: Option<HookFn<TaskSnapshot>>,
    on_success: Option<HookFn<R>>,
    on_error: Option<HookFn<JobExecutionError>>,
    on_finish: Option<HookFn<()>>,
}

impl<R> Default for TaskHooks<R> {
    fn default() -> Self {
        Self {
            before_start: None,
            on_success: None,
            on_error: None,
            on_finish: None,
        }
    }
}

impl<R> Clone for TaskHooks<R> {
    fn clone(&self) -> Self {
        Self {
            before_start: self.before_start.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_finish: self.on_finish.clone(),
        }
    }
}

impl<R> TaskHooks<R> {
    pub(crate) fn set(&mut self, hook: TaskHook<R>) {
        match hook {
            TaskHook::BeforeStart(h) => self.before_start = Some(h),
            TaskHook::OnSuccess(h) => self.on_success = Some(h),
            TaskHook::OnError(h) => self.on_error = Some(h),
            TaskHook::OnFinish(h) => self.on_finish = Some(h),
        }
    }

    pub(crate) fn is_set(&self, event: TaskEvent) -> bool {
        match event {
            TaskEvent::BeforeStart => self.before_start.is_some(),
            TaskEvent::OnSuccess => self.on_success.is_some(),
            TaskEvent::OnError => self.on_error.is_some(),
            TaskEvent::OnFinish => self.on_finish.is_some(),
        }
    }

    pub(crate) fn registered(&self) -> Vec<TaskEvent> {
        TaskEvent::ALL
            .into_iter()
            .filter(|event| self.is_set(*event))
            .collect()
    }

    pub(crate) async fn before_start(&self, snapshot: TaskSnapshot) {
        if let Some(hook) = &self.before_start {
            hook(snapshot).await;
        }
    }

    pub(crate) async fn on_success(&self, value: R) {
        if let Some(hook) = &self.on_success {
            hook(value).await;
        }
    }

    pub(crate) async fn on_error(&self, err: JobExecutionError) {
        if let Some(hook) = &self.on_error {
            hook(err).await;
        }
    }

    pub(crate) async fn on_finish(&self) {
        if let Some(hook) = &self.on_finish {
            hook(()).await;
        }
    }
}

// --- Job hooks ---

/// Lifecycle points of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEvent {
    BeforeStart,
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
    OnSuccess,
    OnError,
    OnFinish,
    /// Reserved: accepted at registration, never fired.
    BeforeClose,
    /// Reserved: accepted at registration, never fired.
    AfterClose,
}

impl JobEvent {
    pub const ALL: [JobEvent; 10] = [
        JobEvent::BeforeStart,
        JobEvent::BeforeAll,
        JobEvent::BeforeEach,
        JobEvent::AfterEach,
        JobEvent::AfterAll,
        JobEvent::OnSuccess,
        JobEvent::OnError,
        JobEvent::OnFinish,
        JobEvent::BeforeClose,
        JobEvent::AfterClose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobEvent::BeforeStart => "beforeStart",
            JobEvent::BeforeAll => "beforeAll",
            JobEvent::BeforeEach => "beforeEach",
            JobEvent::AfterEach => "afterEach",
            JobEvent::AfterAll => "afterAll",
            JobEvent::OnSuccess => "onSuccess",
            JobEvent::OnError => "onError",
            JobEvent::OnFinish => "onFinish",
            JobEvent::BeforeClose => "beforeClose",
            JobEvent::AfterClose => "afterClose",
        }
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobEvent {
    type Err = JobExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beforeStart" | "before_start" => Ok(JobEvent::BeforeStart),
            "beforeAll" | "before_all" => Ok(JobEvent::BeforeAll),
            "beforeEach" | "before_each" => Ok(JobEvent::BeforeEach),
            "afterEach" | "after_each" => Ok(JobEvent::AfterEach),
            "afterAll" | "after_all" => Ok(JobEvent::AfterAll),
            "onSuccess" | "on_success" => Ok(JobEvent::OnSuccess),
            "onError" | "on_error" => Ok(JobEvent::OnError),
            "onFinish" | "on_finish" => Ok(JobEvent::OnFinish),
            "beforeClose" | "before_close" => Ok(JobEvent::BeforeClose),
            "afterClose" | "after_close" => Ok(JobEvent::AfterClose),
            other => Err(JobExecutionError::new(format!(
                "unknown job hook '{other}'"
            ))),
        }
    }
}

/// A handler bound to one [`JobEvent`].
pub enum JobHook<R> {
    BeforeStart(HookFn<JobSnapshot>),
    BeforeAll(HookFn<()>),
    BeforeEach(HookFn<TaskSnapshot>),
    AfterEach(HookFn<TaskSnapshot>),
    AfterAll(HookFn<JobSnapshot>),
    /// Receives every result, in execution order. Only fired when no task failed.
    OnSuccess(HookFn<Vec<R>>),
    /// Fired once per task failure that propagated out of the task.
    OnError(HookFn<JobExecutionError>),
    /// Receives the aggregated errors and results; always fired once per run.
    OnFinish(HookFn<(Vec<JobExecutionError>, Vec<R>)>),
    BeforeClose(HookFn<()>),
    AfterClose(HookFn<()>),
}

impl<R: 'static> JobHook<R> {
    pub fn before_start<F, Fut>(f: F) -> Self
    where
        F: Fn(JobSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::BeforeStart(hook_fn(f))
    }

    pub fn before_all<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::BeforeAll(hook_fn(move |_: ()| f()))
    }

    pub fn before_each<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::BeforeEach(hook_fn(f))
    }

    pub fn after_each<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::AfterEach(hook_fn(f))
    }

    pub fn after_all<F, Fut>(f: F) -> Self
    where
        F: Fn(JobSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::AfterAll(hook_fn(f))
    }

    pub fn on_success<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::OnSuccess(hook_fn(f))
    }

    pub fn on_error<F, Fut>(f: F) -> Self
    where
        F: Fn(JobExecutionError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::OnError(hook_fn(f))
    }

    pub fn on_finish<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<JobExecutionError>, Vec<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::OnFinish(hook_fn(
            move |(errors, results): (Vec<JobExecutionError>, Vec<R>)| f(errors, results),
        ))
    }

    pub fn before_close<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::BeforeClose(hook_fn(move |_: ()| f()))
    }

    pub fn after_close<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        JobHook::AfterClose(hook_fn(move |_: ()| f()))
    }
}

impl<R> JobHook<R> {
    pub fn event(&self) -> JobEvent {
        match self {
            JobHook::BeforeStart(_) => JobEvent::BeforeStart,
            JobHook::BeforeAll(_) => JobEvent::BeforeAll,
            JobHook::BeforeEach(_) => JobEvent::BeforeEach,
            JobHook::AfterEach(_) => JobEvent::AfterEach,
            JobHook::AfterAll(_) => JobEvent::AfterAll,
            JobHook::OnSuccess(_) => JobEvent::OnSuccess,
            JobHook::OnError(_) => JobEvent::OnError,
            JobHook::OnFinish(_) => JobEvent::OnFinish,
            JobHook::BeforeClose(_) => JobEvent::BeforeClose,
            JobHook::AfterClose(_) => JobEvent::AfterClose,
        }
    }
}

impl<R> fmt::Debug for JobHook<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JobHook").field(&self.event()).finish()
    }
}

pub(crate) struct JobHooks<R> {
    before_start: Option<HookFn<JobSnapshot>>,
    before_all: Option<HookFn<()>>,
    before_each: Option<HookFn<TaskSnapshot>>,
    after_each: Option<HookFn<TaskSnapshot>>,
    after_all: Option<HookFn<JobSnapshot>>,
    on_success: Option<HookFn<Vec<R>>>,
    on_error: Option<HookFn<JobExecutionError>>,
    on_finish: Option<HookFn<(Vec<JobExecutionError>, Vec<R>)>>,
    before_close: Option<HookFn<()>>,
    after_close: Option<HookFn<()>>,
}

impl<R> Default for JobHooks<R> {
    fn default() -> Self {
        Self {
            before_start: None,
            before_all: None,
            before_each: None,
            after_each: None,
            after_all: None,
            on_success: None,
            on_error: None,
            on_finish: None,
            before_close: None,
            after_close: None,
        }
    }
}

impl<R> JobHooks<R> {
    pub(crate) fn set(&mut self, hook: JobHook<R>) {
        match hook {
            JobHook::BeforeStart(h) => self.before_start = Some(h),
            JobHook::BeforeAll(h) => self.before_all = Some(h),
            JobHook::BeforeEach(h) => self.before_each = Some(h),
            JobHook::AfterEach(h) => self.after_each = Some(h),
            JobHook::AfterAll(h) => self.after_all = Some(h),
            JobHook::OnSuccess(h) => self.on_success = Some(h),
            JobHook::OnError(h) => self.on_error = Some(h),
            JobHook::OnFinish(h) => self.on_finish = Some(h),
            JobHook::BeforeClose(h) => self.before_close = Some(h),
            JobHook::AfterClose(h) => self.after_close = Some(h),
        }
    }

    pub(crate) fn is_set(&self, event: JobEvent) -> bool {
        match event {
            JobEvent::BeforeStart => self.before_start.is_some(),
            JobEvent::BeforeAll => self.before_all.is_some(),
            JobEvent::BeforeEach => self.before_each.is_some(),
            JobEvent::AfterEach => self.after_each.is_some(),
            JobEvent::AfterAll => self.after_all.is_some(),
            JobEvent::OnSuccess => self.on_success.is_some(),
            JobEvent::OnError => self.on_error.is_some(),
            JobEvent::OnFinish => self.on_finish.is_some(),
            JobEvent::BeforeClose => self.before_close.is_some(),
            JobEvent::AfterClose => self.after_close.is_some(),
        }
    }

    pub(crate) fn registered(&self) -> Vec<JobEvent> {
        JobEvent::ALL
            .into_iter()
            .filter(|event| self.is_set(*event))
            .collect()
    }

    pub(crate) async fn before_start(&self, snapshot: JobSnapshot) {
        if let Some(hook) = &self.before_start {
            hook(snapshot).await;
        }
    }

    pub(crate) async fn before_all(&self) {
        if let Some(hook) = &self.before_all {
            hook(()).await;
        }
    }

    pub(crate) async fn before_each(&self, task: TaskSnapshot) {
        if let Some(hook) = &self.before_each {
            hook(task).await;
        }
    }

    pub(crate) async fn after_each(&self, task: TaskSnapshot) {
        if let Some(hook) = &self.after_each {
            hook(task).await;
        }
    }

    pub(crate) async fn after_all(&self, snapshot: JobSnapshot) {
        if let Some(hook) = &self.after_all {
            hook(snapshot).await;
        }
    }

    pub(crate) async fn on_success(&self, results: Vec<R>) {
        if let Some(hook) = &self.on_success {
            hook(results).await;
        }
    }

    pub(crate) async fn on_error(&self, err: JobExecutionError) {
        if let Some(hook) = &self.on_error {
            hook(err).await;
        }
    }

    pub(crate) async fn on_finish(&self, errors: Vec<JobExecutionError>, results: Vec<R>) {
        if let Some(hook) = &self.on_finish {
            hook((errors, results)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn task_event_names_round_trip() {
        for event in TaskEvent::ALL {
            assert_eq!(event.as_str().parse::<TaskEvent>().unwrap(), event);
        }
        assert_eq!("on_error".parse::<TaskEvent>().unwrap(), TaskEvent::OnError);
    }

    #[test]
    fn job_event_names_round_trip() {
        for event in JobEvent::ALL {
            assert_eq!(event.to_string().parse::<JobEvent>().unwrap(), event);
        }
        assert_eq!("after_close".parse::<JobEvent>().unwrap(), JobEvent::AfterClose);
    }

    #[test]
    fn unknown_names_are_reported() {
        let err = "afterEach".parse::<TaskEvent>().unwrap_err();
        assert_eq!(err.message(), "unknown task hook 'afterEach'");

        let err = "onRetry".parse::<JobEvent>().unwrap_err();
        assert_eq!(err.message(), "unknown job hook 'onRetry'");
    }

    #[test]
    fn check_named_rejects_mismatched_handler() {
        assert!(check_named("onFinish", TaskEvent::OnFinish).is_ok());

        let err = check_named("onSuccess", TaskEvent::OnError).unwrap_err();
        assert_eq!(err.message(), "hook 'onSuccess' was given a handler for 'onError'");
    }

    #[test]
    fn setting_a_hook_replaces_the_previous_one() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut hooks: TaskHooks<u32> = TaskHooks::default();

        let first = calls.clone();
        hooks.set(TaskHook::on_success(move |v| {
            first.lock().unwrap().push(("first", v));
            async {}
        }));
        let second = calls.clone();
        hooks.set(TaskHook::on_success(move |v| {
            second.lock().unwrap().push(("second", v));
            async {}
        }));

        futures::executor::block_on(hooks.on_success(9));
        assert_eq!(*calls.lock().unwrap(), vec![("second", 9)]);
        assert_eq!(hooks.registered(), vec![TaskEvent::OnSuccess]);
    }

    #[test]
    fn job_hooks_track_registered_events() {
        let mut hooks: JobHooks<()> = JobHooks::default();
        assert!(hooks.registered().is_empty());

        hooks.set(JobHook::before_all(|| async {}));
        hooks.set(JobHook::before_close(|| async {}));
        hooks.set(JobHook::on_finish(|_, _| async {}));

        assert_eq!(
            hooks.registered(),
            vec![JobEvent::BeforeAll, JobEvent::OnFinish, JobEvent::BeforeClose]
        );
        assert!(!hooks.is_set(JobEvent::AfterClose));
    }

    #[test]
    fn hook_debug_shows_event() {
        let hook: TaskHook<()> = TaskHook::on_finish(|| async {});
        assert_eq!(format!("{hook:?}"), "TaskHook(OnFinish)");
    }
}
