use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
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
pub enum CountDownRole {
    Countdowner,
    Waiter,
}

impl fmt::Display for CountDownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountDownRole::Countdowner => f.write_str("countdowner"),
            CountDownRole::Waiter => f.write_str("waiter"),
        }
    }
}

struct Inner {
    count: AtomicUsize,
    initial: usize,
    unclaimed: AtomicUsize,
    roles: RoleRegistry<CountDownRole>,
    counted_down: TaskLocal<bool>,
    queue: WaitQueue,
}

impl Inner {
    fn reserve_countdowner(&self) -> bool {
        self.unclaimed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok()
    }

    fn is_open(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }
}

/// A latch opened by exactly `count` registered countdowners, each counting
/// down once, and waited for by registered waiters.
///
/// Registering more countdowners than the count, counting down twice, or
/// waiting after counting down are all violations.
#[derive(Clone)]
pub struct CountDownLatch {
    inner: Arc<Inner>,
    permission: PermissionRef,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::invalid_argument(
                "a count-down latch needs a positive count",
            ));
        }

        let inner = Arc::new(Inner {
            count: AtomicUsize::new(count),
            initial: count,
            unclaimed: AtomicUsize::new(count),
            roles: RoleRegistry::new(),
            counted_down: TaskLocal::with_initial(false),
            queue: WaitQueue::new(),
        });

        let permission = Arc::new(Self::make_permission(inner.clone()));
        Ok(Self { inner, permission })
    }

    fn make_permission(inner: Arc<Inner>) -> CheckPermission {
        CheckPermission::new("count-down latch", move |_| match inner.roles.role() {
            Some(CountDownRole::Countdowner) => {
                if inner.counted_down.get() {
                    Err("countdowner already counted down".into())
                } else if inner.is_open() {
                    Err("latch is already open".into())
                } else {
                    Ok(())
                }
            }
            Some(CountDownRole::Waiter) => {
                if inner.is_open() {
                    Ok(())
                } else {
                    Err("latch is not open yet".into())
                }
            }
            None => Err("task is not registered with the latch".into()),
        })
    }

    pub fn register_countdowner(&self) -> Result<()> {
        let inner = &self.inner;
        inner.roles.ensure_can_register(CountDownRole::Countdowner)?;

        if !inner.reserve_countdowner() {
            return Err(Error::task_violation(format_args!(
                "cannot register as countdowner: all {} countdowners already registered",
                inner.initial
            )));
        }

        inner.roles.register(CountDownRole::Countdowner)
    }

    pub fn register_waiter(&self) -> Result<()> {
        self.inner.roles.register(CountDownRole::Waiter)
    }

    pub fn count_down(&self) -> Result<()> {
        let inner = &self.inner;
        inner.roles.check(CountDownRole::Countdowner)?;

        if inner.counted_down.get() {
            return Err(Error::task_violation("already counted down"));
        }

        let prev = inner
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
            .map_err(|_| Error::task_violation("cannot count down an open latch"))?;

        inner.counted_down.set(true);

        if prev == 1 {
            debug!("count-down latch opened");
            inner.queue.wake_all();
        }

        Ok(())
    }

    /// Blocks until the count reaches zero.
    pub fn wait(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.counted_down.get() {
            return Err(Error::task_violation("cannot wait after counting down"));
        }

        inner.roles.check(CountDownRole::Waiter)?;
        inner.queue.wait_until(|| ready_if(inner.is_open()), None)?;

        Ok(())
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Holds for countdowners that have not counted down yet while the latch
    /// is closed, and for waiters once it is open.
    pub fn permission(&self) -> PermissionRef {
        self.permission.clone()
    }
}

impl fmt::Debug for CountDownLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountDownLatch")
            .field("count", &self.count())
            .field("initial", &self.inner.initial)
            .finish()
    }
}
