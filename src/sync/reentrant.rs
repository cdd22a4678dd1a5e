use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::trace;

use super::WaitQueue;
use crate::{
    error::{Error, Result},
    permission::{HoldsLock, LockOwnership, PermissionRef},
};

const FREE: u64 = 0;

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

fn thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

struct Inner {
    owner: AtomicU64,
    holds: AtomicUsize,
    queue: WaitQueue,
}

impl Inner {
    fn try_acquire(&self, me: u64) -> bool {
        if self.owner.load(Ordering::Relaxed) == me {
            self.holds.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        if self
            .owner
            .compare_exchange(FREE, me, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.holds.store(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    fn lock_until(&self, deadline: Option<Instant>) -> Result<bool> {
        let me = thread_token();
        let acquired = self
            .queue
            .wait_until(|| super::ready_if(self.try_acquire(me)), deadline)?
            .is_some();

        if acquired {
            trace!("lock acquired by thread token {}", me);
        }

        Ok(acquired)
    }
}

impl LockOwnership for Inner {
    fn is_held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Acquire) == thread_token()
    }
}

/// A reentrant mutual-exclusion lock whose permission holds while the calling
/// thread owns it.
///
/// Ownership is per thread, not per task: a task resumed on another thread
/// does not hold the lock it took earlier.
#[derive(Clone)]
pub struct ReentrantLock {
    inner: Arc<Inner>,
    locked_permission: PermissionRef,
}

impl ReentrantLock {
    pub fn new() -> Self {
        let inner = Arc::new(Inner {
            owner: AtomicU64::new(FREE),
            holds: AtomicUsize::new(0),
            queue: WaitQueue::new(),
        });

        let locked_permission = Arc::new(HoldsLock::new(inner.clone()));
        Self {
            inner,
            locked_permission,
        }
    }

    /// Blocks until the lock is acquired; fails only on interrupt.
    pub fn lock(&self) -> Result<()> {
        self.inner.lock_until(None).map(|_| ())
    }

    pub fn try_lock(&self) -> bool {
        self.inner.try_acquire(thread_token())
    }

    pub fn try_lock_for(&self, timeout: Duration) -> Result<bool> {
        self.inner.lock_until(Some(Instant::now() + timeout))
    }

    pub fn unlock(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.owner.load(Ordering::Relaxed) != thread_token() {
            return Err(Error::task_violation("cannot unlock a lock it does not hold"));
        }

        if inner.holds.fetch_sub(1, Ordering::Relaxed) == 1 {
            inner.owner.store(FREE, Ordering::Release);
            inner.queue.wake_all();
        }

        Ok(())
    }

    pub fn hold_count(&self) -> usize {
        if self.is_held_by_current_thread() {
            self.inner.holds.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.inner.is_held_by_current_thread()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.owner.load(Ordering::Acquire) != FREE
    }

    pub fn locked_permission(&self) -> PermissionRef {
        self.locked_permission.clone()
    }

    /// Ownership probe for building [`HoldsLock`] permissions by hand.
    pub fn ownership(&self) -> Arc<dyn LockOwnership> {
        self.inner.clone()
    }
}

impl Default for ReentrantLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReentrantLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
