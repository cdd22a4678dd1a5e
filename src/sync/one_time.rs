use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::debug;

use super::{ready_if, WaitQueue};
use crate::{
    error::{Error, Result},
    permission::{CheckPermission, PermissionRef},
    task::TaskLocal,
};

struct Inner {
    opened: AtomicBool,
    called_open: TaskLocal<bool>,
    waited: TaskLocal<bool>,
    queue: WaitQueue,
}

/// A latch opened exactly once by whichever task gets there first.
///
/// The opener may never wait for it, and opening it a second time is a
/// violation.
#[derive(Clone)]
pub struct OneTimeLatch {
    inner: Arc<Inner>,
    open_permission: PermissionRef,
}

impl OneTimeLatch {
    pub fn new() -> Self {
        let inner = Arc::new(Inner {
            opened: AtomicBool::new(false),
            called_open: TaskLocal::with_initial(false),
            waited: TaskLocal::with_initial(false),
            queue: WaitQueue::new(),
        });

        let waited = inner.clone();
        let open_permission = Arc::new(CheckPermission::from_predicate(
            "one-time latch open",
            "task has not waited for the latch to open",
            move |_| waited.waited.get(),
        ));

        Self {
            inner,
            open_permission,
        }
    }

    pub fn open(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.called_open.get() {
            return Err(Error::task_violation("already opened the latch"));
        }

        inner.called_open.set(true);

        if inner
            .opened
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::task_violation("cannot open a latch that is already open"));
        }

        debug!("one-time latch opened");
        inner.queue.wake_all();
        Ok(())
    }

    pub fn wait(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.called_open.get() {
            return Err(Error::task_violation("opened the latch and cannot wait for it"));
        }

        inner
            .queue
            .wait_until(|| ready_if(inner.opened.load(Ordering::Acquire)), None)?;

        inner.waited.set(true);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.inner.opened.load(Ordering::Acquire)
    }

    /// Holds only for tasks that returned from [`OneTimeLatch::wait`].
    pub fn is_open_permission(&self) -> PermissionRef {
        self.open_permission.clone()
    }
}

impl Default for OneTimeLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OneTimeLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneTimeLatch")
            .field("open", &self.is_open())
            .finish()
    }
}
