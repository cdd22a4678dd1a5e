//! Thread-pool execution of closures as tasks.
//!
//! Every submitted closure runs as its own [`Task`] on the blocking pool of a
//! dedicated tokio runtime. The handle returned by `submit` is private to the
//! submitting task.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::{
    error::{Error, Result},
    object::ObjectRef,
    permission::{Access, CheckPermission, Permission, PermissionRef, Permissions},
    sync::{ready_if, WaitQueue},
    task::{catch_panic, Task, TaskLocal},
};

struct Shared {
    shutdown: AtomicBool,
    in_flight: AtomicUsize,
    idle: WaitQueue,
    awaited: TaskLocal<bool>,
}

impl Shared {
    fn is_terminated(&self) -> bool {
        self.shutdown.load(Ordering::Acquire) && self.in_flight.load(Ordering::Acquire) == 0
    }

    fn finish_one(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.idle.wake_all();
    }
}

pub struct TaskExecutor {
    shared: Arc<Shared>,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    termination_permission: PermissionRef,
}

impl TaskExecutor {
    /// An executor running at most `threads` submissions at once.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::invalid_argument("an executor needs at least one thread"));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("intents-executor")
            .build()
            .map_err(|err| Error::internal(format!("failed to start executor runtime: {}", err)))?;

        let shared = Arc::new(Shared {
            shutdown: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            idle: WaitQueue::new(),
            awaited: TaskLocal::with_initial(false),
        });

        let state = shared.clone();
        let termination_permission = Arc::new(CheckPermission::from_predicate(
            "executor terminated",
            "task has not awaited the executor's termination",
            move |_| state.awaited.get() && state.is_terminated(),
        ));

        Ok(Self {
            shared,
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            termination_permission,
        })
    }

    pub fn submit<T, F>(&self, f: F) -> Result<FutureTask<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let shared = &self.shared;
        shared.in_flight.fetch_add(1, Ordering::AcqRel);

        if shared.shutdown.load(Ordering::Acquire) {
            shared.finish_one();
            return Err(Error::Rejected("executor is shut down".into()));
        }

        let cell = Arc::new(ResultCell::new());
        let mut f = Some(f);
        let output = cell.clone();
        let task = Task::new(move || {
            if let Some(f) = f.take() {
                output.set(catch_panic(f));
            }
        });

        let runner = task.clone();
        let output = cell.clone();
        let state = shared.clone();
        self.handle.spawn_blocking(move || {
            if let Err(err) = runner.run() {
                output.set(Err(err));
            }

            state.finish_one();
        });

        debug!("submitted {}", task);
        Ok(FutureTask {
            task,
            cell,
            owner: Permissions::private(),
        })
    }

    /// Stops accepting submissions; already submitted ones still run.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            debug!("executor shutting down");
        }

        self.shared.idle.wake_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }

    /// Waits for all submissions to finish after a shutdown. Returns whether
    /// the executor terminated within `timeout`.
    pub fn await_termination(&self, timeout: Duration) -> Result<bool> {
        let shared = &self.shared;
        let terminated = shared
            .idle
            .wait_until(|| ready_if(shared.is_terminated()), Some(Instant::now() + timeout))?
            .is_some();

        if terminated {
            shared.awaited.set(true);
        }

        Ok(terminated)
    }

    /// Holds for tasks that saw [`TaskExecutor::await_termination`] succeed.
    pub fn await_termination_permission(&self) -> PermissionRef {
        self.termination_permission.clone()
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.lock().take() {
            if !self.shared.is_terminated() {
                warn!("executor dropped with submissions still running");
            }

            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("shutdown", &self.is_shutdown())
            .field("in_flight", &self.shared.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

struct ResultCell<T> {
    value: Mutex<Option<Result<T>>>,
    done: AtomicBool,
    ready: WaitQueue,
}

impl<T> ResultCell<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            done: AtomicBool::new(false),
            ready: WaitQueue::new(),
        }
    }

    fn set(&self, value: Result<T>) {
        *self.value.lock() = Some(value);
        self.done.store(true, Ordering::Release);
        self.ready.wake_all();
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// The pending result of a submitted closure.
pub struct FutureTask<T> {
    task: Task,
    cell: Arc<ResultCell<T>>,
    owner: PermissionRef,
}

impl<T> FutureTask<T> {
    /// Blocks until the closure finished and returns its result.
    ///
    /// Only the submitting task may call this.
    pub fn get(self) -> Result<T> {
        self.owner.check(Access::Call, &ObjectRef::of(&self))?;

        let cell = &self.cell;
        cell.ready.wait_until(|| ready_if(cell.is_done()), None)?;

        let value = cell.value.lock().take();
        value.unwrap_or_else(|| Err(Error::internal("task result already taken")))
    }

    pub fn is_done(&self) -> bool {
        self.cell.is_done()
    }

    /// The task running the closure.
    pub fn task(&self) -> &Task {
        &self.task
    }
}

impl<T> fmt::Debug for FutureTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureTask")
            .field("task", &self.task)
            .field("done", &self.is_done())
            .finish()
    }
}
