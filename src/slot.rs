use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};

use crate::{
    error::{Error, Result},
    object::ObjectRef,
    permission::{Access, Permission, PermissionRef},
    task::Task,
};

lazy_static! {
    // Serializes installations of delegating permissions so that two
    // concurrent same-as links cannot close a cycle between them.
    static ref LINKS: Mutex<()> = Mutex::new(());
}

/// The current permission of one guarded object.
///
/// Checks clone the permission out of the slot and run without holding the
/// slot lock, so a check may freely read other slots (same-as chains do).
pub struct PermissionSlot {
    current: RwLock<PermissionRef>,
}

impl PermissionSlot {
    pub fn new(initial: PermissionRef) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    #[inline]
    pub fn load(&self) -> PermissionRef {
        self.current.read().clone()
    }

    pub fn check(&self, access: Access, target: &ObjectRef) -> Result<()> {
        let permission = self.load();
        trace!(
            "{} checking {} on '{}' against '{}'",
            Task::current(),
            access,
            target,
            permission.name()
        );

        permission.check(access, target)
    }

    /// Replaces the permission if the current one allows a reset.
    ///
    /// The reset check and the swap happen under the slot's write lock, so
    /// concurrent replacements are linearized.
    pub fn replace(&self, new: PermissionRef, target: &ObjectRef, detect_cycles: bool) -> Result<()> {
        let _links = if detect_cycles && new.is_delegating() {
            let guard = LINKS.lock();
            if new.delegates_to(self) {
                return Err(Error::task_violation(format_args!(
                    "cannot make '{}' follow its own permission",
                    target
                )));
            }

            Some(guard)
        } else {
            None
        };

        let mut current = self.current.write();
        current.check_reset(target)?;

        debug!(
            "{} replaced permission on '{}': {} -> {}",
            Task::current(),
            target,
            current.name(),
            new.name()
        );

        *current = new;
        Ok(())
    }
}

impl std::fmt::Debug for PermissionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PermissionSlot({})", self.load().name())
    }
}

pub(crate) fn new_slot(initial: PermissionRef) -> Arc<PermissionSlot> {
    Arc::new(PermissionSlot::new(initial))
}
