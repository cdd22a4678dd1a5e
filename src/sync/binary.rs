use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use super::{ready_if, WaitQueue};
use crate::{
    error::Result,
    permission::{CheckPermission, PermissionRef},
};

mod state {
    pub const CLOSED: usize = 0;
    pub const OPEN: usize = 1;
}

struct Inner {
    state: AtomicUsize,
    queue: WaitQueue,
}

impl Inner {
    fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == state::OPEN
    }
}

/// A plain two-state latch with no registration: anyone may open it, anyone
/// may wait. Opening an open latch does nothing.
#[derive(Clone)]
pub struct BinaryLatch {
    inner: Arc<Inner>,
    closed_permission: PermissionRef,
    open_permission: PermissionRef,
}

impl BinaryLatch {
    pub fn new() -> Self {
        let inner = Arc::new(Inner {
            state: AtomicUsize::new(state::CLOSED),
            queue: WaitQueue::new(),
        });

        let closed = inner.clone();
        let closed_permission = Arc::new(CheckPermission::from_predicate(
            "binary latch closed",
            "latch is open",
            move |_| !closed.is_open(),
        ));

        let open = inner.clone();
        let open_permission = Arc::new(CheckPermission::from_predicate(
            "binary latch open",
            "latch is closed",
            move |_| open.is_open(),
        ));

        Self {
            inner,
            closed_permission,
            open_permission,
        }
    }

    pub fn open(&self) {
        if self.inner.state.swap(state::OPEN, Ordering::AcqRel) == state::CLOSED {
            log::debug!("binary latch opened");
        }

        self.inner.queue.wake_all();
    }

    pub fn wait(&self) -> Result<()> {
        let inner = &self.inner;
        inner.queue.wait_until(|| ready_if(inner.is_open()), None)?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn closed_permission(&self) -> PermissionRef {
        self.closed_permission.clone()
    }

    pub fn open_permission(&self) -> PermissionRef {
        self.open_permission.clone()
    }
}

impl Default for BinaryLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BinaryLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryLatch")
            .field("open", &self.is_open())
            .finish()
    }
}
