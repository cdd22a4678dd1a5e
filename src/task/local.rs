use std::sync::atomic::{AtomicU64, Ordering};

use super::Task;

static NEXT_LOCAL_KEY: AtomicU64 = AtomicU64::new(1);

/// A value kept per task instead of per thread.
///
/// Every task sees its own copy, created from the initializer on first use.
/// Because a task never runs on two threads at once, the value is only ever
/// touched by the thread currently running its task.
pub struct TaskLocal<T> {
    key: u64,
    init: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Send + 'static> TaskLocal<T> {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            key: NEXT_LOCAL_KEY.fetch_add(1, Ordering::Relaxed),
            init: Box::new(init),
        }
    }

    pub fn with_initial(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move || value.clone())
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(|value| value.clone())
    }

    pub fn set(&self, value: T) {
        Task::current().put_local(self.key, Box::new(value));
    }

    /// Removes the current task's value; the next access re-initializes it.
    pub fn remove(&self) -> Option<T> {
        self.take(&Task::current())
    }

    /// Runs `f` on the current task's value.
    ///
    /// The value is taken out of the task while `f` runs, so `f` may use other
    /// task-locals; a nested access to this same local sees a fresh value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let task = Task::current();
        let mut value = self.take(&task).unwrap_or_else(|| (self.init)());
        let out = f(&mut value);
        task.put_local(self.key, Box::new(value));
        out
    }

    fn take(&self, task: &Task) -> Option<T> {
        task.take_local(self.key)
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}

impl<T> std::fmt::Debug for TaskLocal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskLocal({})", self.key)
    }
}
