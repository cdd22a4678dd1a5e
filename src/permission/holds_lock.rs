use std::sync::Arc;

use super::{denied, Access, Permission};
use crate::{error::Result, object::ObjectRef};

/// Anything that can tell whether the calling thread holds it.
pub trait LockOwnership: Send + Sync + 'static {
    fn is_held_by_current_thread(&self) -> bool;
}

/// Passes while the calling thread holds `lock`.
pub struct HoldsLock {
    lock: Arc<dyn LockOwnership>,
}

impl HoldsLock {
    pub fn new(lock: Arc<dyn LockOwnership>) -> Self {
        Self { lock }
    }

    fn check_access(&self, access: Access, target: &ObjectRef) -> Result<()> {
        if self.lock.is_held_by_current_thread() {
            Ok(())
        } else {
            Err(denied(access, target, "lock is not held"))
        }
    }
}

impl Permission for HoldsLock {
    fn check_call(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Call, target)
    }

    fn check_get(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Get, target)
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Put, target)
    }

    fn name(&self) -> &str {
        "holds-lock"
    }
}
