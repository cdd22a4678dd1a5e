use super::{Permission, PermissionRef};
use crate::{error::Result, object::ObjectRef, slot::PermissionSlot};

/// Both permissions must pass; the first failure is reported.
pub struct Chained {
    first: PermissionRef,
    second: PermissionRef,
}

impl Chained {
    pub fn new(first: PermissionRef, second: PermissionRef) -> Self {
        Self { first, second }
    }
}

impl Permission for Chained {
    fn check_call(&self, target: &ObjectRef) -> Result<()> {
        self.first.check_call(target)?;
        self.second.check_call(target)
    }

    fn check_get(&self, target: &ObjectRef) -> Result<()> {
        self.first.check_get(target)?;
        self.second.check_get(target)
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        self.first.check_put(target)?;
        self.second.check_put(target)
    }

    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        self.first.check_reset(target)?;
        self.second.check_reset(target)
    }

    fn name(&self) -> &str {
        "chained"
    }

    fn is_delegating(&self) -> bool {
        self.first.is_delegating() || self.second.is_delegating()
    }

    fn delegates_to(&self, slot: &PermissionSlot) -> bool {
        self.first.delegates_to(slot) || self.second.delegates_to(slot)
    }
}
