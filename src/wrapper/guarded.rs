use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use super::Protected;
use crate::{
    config::Config,
    error::Result,
    object::ObjectRef,
    permission::{Access, PermissionRef, Permissions, SameAs},
    slot::{new_slot, PermissionSlot},
};

struct GuardedInner<T> {
    slot: Arc<PermissionSlot>,
    value: RwLock<T>,
}

/// Shared data whose every access is checked against a permission.
///
/// A new `Guarded` is private to the task that created it. Clones are handles
/// to the same object and share its permission.
///
/// The closures passed to the accessors run under the value's lock; calling
/// back into the same `Guarded` from inside one of them deadlocks.
pub struct Guarded<T> {
    inner: Arc<GuardedInner<T>>,
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self::with_permission(value, Permissions::private())
    }

    pub fn with_permission(value: T, permission: PermissionRef) -> Self {
        Self {
            inner: Arc::new(GuardedInner {
                slot: new_slot(permission),
                value: RwLock::new(value),
            }),
        }
    }

    /// A `&self` method call on the value.
    pub fn call<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.check(Access::Call)?;
        Ok(f(&self.inner.value.read()))
    }

    /// A `&mut self` method call on the value.
    pub fn call_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.check(Access::Call)?;
        Ok(f(&mut self.inner.value.write()))
    }

    /// A field read.
    pub fn get<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.check(Access::Get)?;
        Ok(f(&self.inner.value.read()))
    }

    /// A field write.
    pub fn put<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.check(Access::Put)?;
        Ok(f(&mut self.inner.value.write()))
    }

    /// Reads without a check; meant for fields that never change after
    /// construction.
    pub fn get_unchecked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    pub fn permission(&self) -> PermissionRef {
        self.inner.slot.load()
    }

    pub fn set_permission(&self, permission: PermissionRef) -> Result<()> {
        let detect = Config::global().detect_same_as_cycles;
        self.inner
            .slot
            .replace(permission, &self.object_ref(), detect)
    }

    /// Makes every later check follow `leader`'s permission, whatever it is at
    /// the time of the check. Permanent.
    pub fn same_permission_as(&self, leader: &dyn Protected) -> Result<()> {
        self.set_permission(Arc::new(SameAs::new(leader)))
    }

    pub fn set_compound_permission<I>(&self, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = PermissionRef>,
    {
        self.set_permission(Permissions::compound(permissions)?)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn check(&self, access: Access) -> Result<()> {
        self.inner.slot.check(access, &self.object_ref())
    }
}

impl<T> Protected for Guarded<T> {
    fn permission_slot(&self) -> Arc<PermissionSlot> {
        self.inner.slot.clone()
    }

    fn object_ref(&self) -> ObjectRef {
        ObjectRef::from_parts(Arc::as_ptr(&self.inner) as *const () as usize, std::any::type_name::<T>())
    }
}

impl<T> Clone for Guarded<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guarded({})", self.object_ref())
    }
}
