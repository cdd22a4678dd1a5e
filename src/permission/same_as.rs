use std::sync::Arc;

use super::{Access, Permission};
use crate::{
    error::{Error, Result},
    object::ObjectRef,
    slot::PermissionSlot,
    wrapper::Protected,
};

/// Delegates every check to whatever permission the leader holds at the time
/// of the check. Cannot be replaced once installed.
pub struct SameAs {
    leader: Arc<PermissionSlot>,
    leader_ref: ObjectRef,
}

impl SameAs {
    pub fn new(leader: &dyn Protected) -> Self {
        Self::from_slot(leader.permission_slot(), leader.object_ref())
    }

    pub(crate) fn from_slot(leader: Arc<PermissionSlot>, leader_ref: ObjectRef) -> Self {
        Self { leader, leader_ref }
    }

    pub fn leader(&self) -> ObjectRef {
        self.leader_ref
    }
}

impl Permission for SameAs {
    fn check_call(&self, target: &ObjectRef) -> Result<()> {
        self.leader.load().check(Access::Call, target)
    }

    fn check_get(&self, target: &ObjectRef) -> Result<()> {
        self.leader.load().check(Access::Get, target)
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        self.leader.load().check(Access::Put, target)
    }

    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        Err(Error::task_violation(format_args!(
            "cannot reset permission on '{}' (it follows '{}')",
            target, self.leader_ref
        )))
    }

    fn name(&self) -> &str {
        "same-as"
    }

    fn is_delegating(&self) -> bool {
        true
    }

    fn delegates_to(&self, slot: &PermissionSlot) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.leader), slot) || self.leader.load().delegates_to(slot)
    }
}
