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
    task::{RoleRegistry, TaskLocal},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchRole {
    Opener,
    Waiter,
}

impl fmt::Display for LatchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatchRole::Opener => f.write_str("opener"),
            LatchRole::Waiter => f.write_str("waiter"),
        }
    }
}

struct Inner {
    opened: AtomicBool,
    roles: RoleRegistry<LatchRole>,
    called_open: TaskLocal<bool>,
    queue: WaitQueue,
}

impl Inner {
    fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }
}

/// A one-time latch whose openers and waiters register up front.
///
/// Any number of openers may register; each opens at most once, and the
/// first open releases the waiters. Waiters may touch data guarded by
/// [`OneTimeLatchRegistration::permission`] only after the latch opened,
/// openers only before.
#[derive(Clone)]
pub struct OneTimeLatchRegistration {
    inner: Arc<Inner>,
    permission: PermissionRef,
    closed_permission: PermissionRef,
    open_permission: PermissionRef,
}

impl OneTimeLatchRegistration {
    pub fn new() -> Self {
        let inner = Arc::new(Inner {
            opened: AtomicBool::new(false),
            roles: RoleRegistry::new(),
            called_open: TaskLocal::with_initial(false),
            queue: WaitQueue::new(),
        });

        let state = inner.clone();
        let permission = Arc::new(CheckPermission::new(
            "one-time latch",
            move |_| match state.roles.role() {
                Some(LatchRole::Opener) if state.is_open() => Err("latch is already open".into()),
                Some(LatchRole::Opener) => Ok(()),
                Some(LatchRole::Waiter) if state.is_open() => Ok(()),
                Some(LatchRole::Waiter) => Err("latch is not open yet".into()),
                None => Err("task is not registered with the latch".into()),
            },
        ));

        let state = inner.clone();
        let closed_permission = Arc::new(CheckPermission::from_predicate(
            "one-time latch closed",
            "only openers may access before the latch opens",
            move |_| state.roles.is(LatchRole::Opener) && !state.is_open(),
        ));

        let state = inner.clone();
        let open_permission = Arc::new(CheckPermission::from_predicate(
            "one-time latch open",
            "only waiters may access after the latch opens",
            move |_| state.roles.is(LatchRole::Waiter) && state.is_open(),
        ));

        Self {
            inner,
            permission,
            closed_permission,
            open_permission,
        }
    }

    pub fn register_opener(&self) -> Result<()> {
        self.inner.roles.register(LatchRole::Opener)
    }

    pub fn register_waiter(&self) -> Result<()> {
        self.inner.roles.register(LatchRole::Waiter)
    }

    pub fn open(&self) -> Result<()> {
        let inner = &self.inner;
        inner.roles.check(LatchRole::Opener)?;

        if inner.called_open.get() {
            return Err(Error::task_violation("already opened the latch"));
        }

        inner.called_open.set(true);

        if inner.opened.swap(true, Ordering::AcqRel) {
            return Err(Error::task_violation(
                "cannot open a latch that is already open",
            ));
        }

        debug!("one-time latch opened");
        inner.queue.wake_all();

        Ok(())
    }

    pub fn wait(&self) -> Result<()> {
        let inner = &self.inner;
        inner.roles.check(LatchRole::Waiter)?;
        inner.queue.wait_until(|| ready_if(inner.is_open()), None)?;

        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn permission(&self) -> PermissionRef {
        self.permission.clone()
    }

    pub fn is_closed_permission(&self) -> PermissionRef {
        self.closed_permission.clone()
    }

    pub fn is_open_permission(&self) -> PermissionRef {
        self.open_permission.clone()
    }
}

impl Default for OneTimeLatchRegistration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OneTimeLatchRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneTimeLatchRegistration")
            .field("open", &self.is_open())
            .finish()
    }
}
