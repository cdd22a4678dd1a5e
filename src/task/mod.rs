//! Tasks are the unit permissions are granted to.
//!
//! A task is a runnable body with an identity. At most one thread runs a given
//! task at any instant, but successive runs may happen on different threads,
//! and task-local state follows the task rather than the thread. Threads that
//! never ran a task get a bootstrap task of their own the first time they ask
//! for [`Task::current`].

mod local;
mod registration;

use std::{
    any::Any,
    cell::RefCell,
    collections::HashMap,
    fmt,
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle, Thread},
};

use log::debug;
use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    permission::{CheckPermission, PermissionRef},
    sync::WaitQueue,
};

pub use local::TaskLocal;
pub use registration::{Role, RoleRegistry};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw value of "no task"; real ids start at one.
    pub(crate) const UNBOUND: u64 = 0;

    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        if raw == Self::UNBOUND {
            None
        } else {
            Some(TaskId(raw))
        }
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Body = Box<dyn FnMut() + Send>;
pub(crate) type LocalMap = HashMap<u64, Box<dyn Any + Send>>;

struct TaskInner {
    id: TaskId,
    name: Option<String>,
    // `None` for bootstrap tasks, which cannot be run.
    body: Option<Mutex<Body>>,
    running: AtomicBool,
    interrupted: AtomicBool,
    runner: Mutex<Option<Thread>>,
    locals: Mutex<Option<LocalMap>>,
    completed_runs: AtomicU64,
    finished: WaitQueue,
    joiners: TaskLocal<bool>,
}

#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

thread_local! {
    static CURRENT: RefCell<Option<Task>> = RefCell::new(None);
}

impl Task {
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::build(None, Some(Box::new(body)))
    }

    pub fn with_name<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::build(Some(name.into()), Some(Box::new(body)))
    }

    fn build(name: Option<String>, body: Option<Body>) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                name,
                body: body.map(Mutex::new),
                running: AtomicBool::new(false),
                interrupted: AtomicBool::new(false),
                runner: Mutex::new(None),
                locals: Mutex::new(None),
                completed_runs: AtomicU64::new(0),
                finished: WaitQueue::new(),
                joiners: TaskLocal::with_initial(false),
            }),
        }
    }

    /// The task running on this thread, bootstrapping one on first use.
    pub fn current() -> Task {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            if let Some(task) = current.as_ref() {
                return task.clone();
            }

            let task = Task::build(thread::current().name().map(str::to_owned), None);
            task.inner.running.store(true, Ordering::Release);
            *task.inner.runner.lock() = Some(thread::current());

            debug!("bootstrapped {} for thread {:?}", task, thread::current().id());
            *current = Some(task.clone());
            task
        })
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn is_bootstrap(&self) -> bool {
        self.inner.body.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Runs the body on the calling thread, with this task as the current
    /// task for the duration.
    ///
    /// Running a task that is already running anywhere is a violation.
    pub fn run(&self) -> Result<()> {
        let body = self.inner.body.as_ref().ok_or_else(|| {
            Error::task_violation(format_args!("cannot run bootstrap task {}", self))
        })?;

        let _run = self.begin_run()?;
        let _enter = Enter::new(self);

        debug!("running {} on thread {:?}", self, thread::current().id());
        let mut guard = body.lock();
        let body: &mut (dyn FnMut() + Send) = &mut **guard;
        body();

        Ok(())
    }

    /// Runs the task on a fresh thread.
    pub fn spawn(&self) -> Result<JoinHandle<Result<()>>> {
        let task = self.clone();
        thread::Builder::new()
            .name(format!("intents-task-{}", self.id().as_u64()))
            .spawn(move || task.run())
            .map_err(|err| Error::internal(format!("failed to spawn thread for {}: {}", self, err)))
    }

    /// Drives `fut` with this task as the current task whenever it is polled.
    ///
    /// The task counts as running until the future completes or is dropped.
    pub async fn scope<F: Future>(&self, fut: F) -> Result<F::Output> {
        let _run = self.begin_run()?;
        let mut fut = Box::pin(fut);

        Ok(futures::future::poll_fn(|cx| {
            let _enter = Enter::new(self);
            *self.inner.runner.lock() = Some(thread::current());
            fut.as_mut().poll(cx)
        })
        .await)
    }

    /// Blocks until the current (or next) run of this task completes.
    ///
    /// Afterwards [`Task::join_permission`] holds for the calling task.
    pub fn join(&self) -> Result<()> {
        if Task::current() == *self {
            return Err(Error::task_violation("cannot join itself"));
        }

        if self.is_bootstrap() {
            return Err(Error::task_violation(format_args!(
                "cannot join bootstrap task {}",
                self
            )));
        }

        let inner = &self.inner;
        inner.finished.wait_until(
            || {
                let done = inner.completed_runs.load(Ordering::Acquire) > 0
                    && !inner.running.load(Ordering::Acquire);

                if done {
                    Some(())
                } else {
                    None
                }
            },
            None,
        )?;

        inner.joiners.set(true);
        Ok(())
    }

    /// Holds for tasks that joined this task after it finished.
    pub fn join_permission(&self) -> PermissionRef {
        let inner = self.inner.clone();
        let name = format!("joined {}", self);

        Arc::new(CheckPermission::from_predicate(
            name,
            "task has not joined the running task",
            move |_| {
                inner.joiners.get()
                    && inner.completed_runs.load(Ordering::Acquire) > 0
                    && !inner.running.load(Ordering::Acquire)
            },
        ))
    }

    /// Makes the next (or current) blocking wait of this task fail with
    /// [`Error::Interrupted`].
    pub fn interrupt(&self) {
        self.inner.interrupted.store(true, Ordering::Release);
        if let Some(thread) = self.inner.runner.lock().as_ref() {
            thread.unpark();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::Acquire)
    }

    /// Clears and returns the interrupt flag.
    pub(crate) fn take_interrupt(&self) -> bool {
        self.inner.interrupted.swap(false, Ordering::AcqRel)
    }

    fn begin_run(&self) -> Result<RunGuard<'_>> {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Err(Error::task_violation(format_args!(
                "cannot run {}: it is already running",
                self
            )));
        }

        *self.inner.runner.lock() = Some(thread::current());
        Ok(RunGuard { task: self })
    }

    pub(crate) fn take_local(&self, key: u64) -> Option<Box<dyn Any + Send>> {
        self.inner.locals.lock().as_mut().and_then(|map| map.remove(&key))
    }

    pub(crate) fn put_local(&self, key: u64, value: Box<dyn Any + Send>) {
        self.inner
            .locals
            .lock()
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.name {
            Some(name) => write!(f, "task{}({})", self.inner.id, name),
            None => write!(f, "task{}", self.inner.id),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id.as_u64())
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Installs a task as the thread's current task until dropped.
struct Enter {
    prev: Option<Task>,
}

impl Enter {
    fn new(task: &Task) -> Self {
        let prev = CURRENT.with(|current| current.replace(Some(task.clone())));
        Self { prev }
    }
}

impl Drop for Enter {
    fn drop(&mut self) {
        let prev = self.prev.take();
        let _ = CURRENT.try_with(move |current| *current.borrow_mut() = prev);
    }
}

/// Ends a run: clears the running flag and wakes joiners, also on unwind.
struct RunGuard<'a> {
    task: &'a Task,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.task.inner;
        inner.runner.lock().take();
        inner.completed_runs.fetch_add(1, Ordering::AcqRel);
        inner.running.store(false, Ordering::Release);
        inner.finished.wake_all();

        if thread::panicking() {
            debug!("{} unwound", self.task);
        } else {
            debug!("{} finished", self.task);
        }
    }
}

/// Runs `f` catching a panic into [`Error::Panicked`].
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());

        Error::Panicked(msg)
    })
}
