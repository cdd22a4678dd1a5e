use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::debug;

use super::WaitQueue;
use crate::{
    error::{Error, Result},
    permit::{Permit, RootPermit},
    task::RoleRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemaphoreRole {
    Acquirer,
    Releaser,
}

impl fmt::Display for SemaphoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemaphoreRole::Acquirer => f.write_str("acquirer"),
            SemaphoreRole::Releaser => f.write_str("releaser"),
        }
    }
}

struct Inner {
    available: AtomicUsize,
    root: RootPermit,
    roles: RoleRegistry<SemaphoreRole>,
    queue: WaitQueue,
}

impl Inner {
    fn try_take(&self, count: usize) -> Option<Vec<Permit>> {
        self.available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(count))
            .ok()
            .map(|_| self.root.derive_many(count))
    }
}

/// A counting semaphore whose acquirers and releasers are disjoint sets of
/// tasks.
///
/// Acquiring yields [`Permit`] tokens; releasing takes them back and rejects
/// tokens minted by a different semaphore. The semaphore does not mint a
/// data permission.
#[derive(Clone)]
pub struct DisjointSemaphore {
    inner: Arc<Inner>,
}

impl DisjointSemaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                available: AtomicUsize::new(permits),
                root: RootPermit::new(),
                roles: RoleRegistry::new(),
                queue: WaitQueue::new(),
            }),
        }
    }

    pub fn register_acquirer(&self) -> Result<()> {
        self.inner.roles.register(SemaphoreRole::Acquirer)
    }

    pub fn register_releaser(&self) -> Result<()> {
        self.inner.roles.register(SemaphoreRole::Releaser)
    }

    /// Blocks until `count` permits are available and takes them.
    pub fn acquire(&self, count: usize) -> Result<Vec<Permit>> {
        self.acquire_until(count, None)?
            .ok_or_else(|| Error::internal("untimed acquire returned without permits"))
    }

    pub fn try_acquire(&self, count: usize) -> Result<Option<Vec<Permit>>> {
        self.prepare_acquire(count)?;
        Ok(self.inner.try_take(count))
    }

    pub fn try_acquire_for(&self, count: usize, timeout: Duration) -> Result<Option<Vec<Permit>>> {
        self.acquire_until(count, Some(Instant::now() + timeout))
    }

    fn prepare_acquire(&self, count: usize) -> Result<()> {
        self.inner.roles.check(SemaphoreRole::Acquirer)?;
        if count == 0 {
            return Err(Error::invalid_argument("cannot acquire zero permits"));
        }

        Ok(())
    }

    fn acquire_until(&self, count: usize, deadline: Option<Instant>) -> Result<Option<Vec<Permit>>> {
        self.prepare_acquire(count)?;

        let inner = &self.inner;
        inner.queue.wait_until(|| inner.try_take(count), deadline)
    }

    /// Returns permits to the semaphore.
    ///
    /// Every permit is checked before any is returned, so a single foreign
    /// permit fails the whole release.
    pub fn release(&self, permits: Vec<Permit>) -> Result<()> {
        let inner = &self.inner;
        inner.roles.check(SemaphoreRole::Releaser)?;

        if let Some(foreign) = permits.iter().find(|p| !p.belongs_to(&inner.root)) {
            return Err(Error::task_violation(format_args!(
                "cannot release {:?}: it was not issued by this semaphore",
                foreign
            )));
        }

        let count = permits.len();
        drop(permits);

        inner.available.fetch_add(count, Ordering::AcqRel);
        debug!("released {} permits", count);
        inner.queue.wake_all();

        Ok(())
    }

    pub fn available_permits(&self) -> usize {
        self.inner.available.load(Ordering::Acquire)
    }

    /// Permits acquired and not yet released.
    pub fn outstanding_permits(&self) -> usize {
        self.inner.root.granted()
    }
}

impl fmt::Debug for DisjointSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisjointSemaphore")
            .field("available", &self.available_permits())
            .field("outstanding", &self.outstanding_permits())
            .finish()
    }
}
