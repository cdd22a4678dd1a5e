use std::{fmt, sync::Arc};

use super::Protected;
use crate::{
    config::Config,
    error::Result,
    object::ObjectRef,
    permission::{Access, PermissionRef, Permissions},
    slot::{new_slot, PermissionSlot},
};

/// Checks every method call on a shared, possibly unsized, target.
///
/// Unlike [`Guarded`](super::Guarded) the proxy only sees whole calls, so it
/// checks them all as calls.
pub struct Proxy<T: ?Sized> {
    target: Arc<T>,
    slot: Arc<PermissionSlot>,
}

impl<T: ?Sized> Proxy<T> {
    pub fn new(target: Arc<T>, permission: PermissionRef) -> Self {
        Self {
            target,
            slot: new_slot(permission),
        }
    }

    pub fn new_private(target: Arc<T>) -> Self {
        Self::new(target, Permissions::private())
    }

    pub fn new_frozen(target: Arc<T>) -> Self {
        Self::new(target, Permissions::frozen())
    }

    pub fn new_thread_safe(target: Arc<T>) -> Self {
        Self::new(target, Permissions::thread_safe())
    }

    pub fn invoke<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.slot.check(Access::Call, &self.object_ref())?;
        Ok(f(&self.target))
    }

    pub fn permission(&self) -> PermissionRef {
        self.slot.load()
    }

    pub fn set_permission(&self, permission: PermissionRef) -> Result<()> {
        let detect = Config::global().detect_same_as_cycles;
        self.slot.replace(permission, &self.object_ref(), detect)
    }
}

impl<T: ?Sized> Protected for Proxy<T> {
    fn permission_slot(&self) -> Arc<PermissionSlot> {
        self.slot.clone()
    }

    fn object_ref(&self) -> ObjectRef {
        ObjectRef::of_arc(&self.target)
    }
}

impl<T: ?Sized> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proxy({})", self.object_ref())
    }
}
