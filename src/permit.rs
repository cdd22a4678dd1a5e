use std::{fmt, sync::Arc};

/// One unit of a semaphore's capacity, held by the task that acquired it.
///
/// Permits cannot be cloned or built by hand; the only way to get one is to
/// acquire it, and the only way to give capacity back is to hand the permit
/// to `release` of the semaphore it came from.
pub struct Permit(Arc<()>);

impl Permit {
    fn new(inner: Arc<()>) -> Self {
        Permit(inner)
    }

    pub fn belongs_to(&self, other: &RootPermit) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permit({:p})", Arc::as_ptr(&self.0))
    }
}

/// Issues permits for one semaphore and recognizes them on release.
pub struct RootPermit(Arc<()>);

impl RootPermit {
    pub(crate) fn new() -> Self {
        Self(Arc::new(()))
    }

    pub(crate) fn derive(&self) -> Permit {
        Permit::new(self.0.clone())
    }

    pub(crate) fn derive_many(&self, count: usize) -> Vec<Permit> {
        (0..count).map(|_| self.derive()).collect()
    }

    /// Permits issued and not yet released or dropped.
    pub fn granted(&self) -> usize {
        Arc::strong_count(&self.0) - 1
    }
}

impl fmt::Debug for RootPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootPermit({:p}, granted: {})", Arc::as_ptr(&self.0), self.granted())
    }
}
