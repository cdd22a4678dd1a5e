//! Permissions decide, per access, whether the current task may touch an
//! object.
//!
//! Every guarded object carries exactly one permission at a time. Each of the
//! three access kinds (method call, field read, field write) is checked
//! independently, and replacing the permission is itself an access that the
//! *current* permission must allow.

mod basic;
mod chained;
mod check;
mod holds_lock;
mod owned;
mod same_as;

use std::{fmt, sync::Arc};

use lazy_static::lazy_static;

use crate::{
    error::{Error, Result},
    object::ObjectRef,
    slot::PermissionSlot,
    task::Task,
    wrapper::Protected,
};

pub use basic::{AlwaysFails, Frozen, PermanentlyThreadSafe, ThreadSafe};
pub use chained::Chained;
pub use check::CheckPermission;
pub use holds_lock::{HoldsLock, LockOwnership};
pub use owned::{Loan, Private, Transfer};
pub use same_as::SameAs;

pub type PermissionRef = Arc<dyn Permission>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Call,
    Get,
    Put,
    Reset,
}

impl Access {
    fn describe(self) -> &'static str {
        match self {
            Access::Call => "call methods",
            Access::Get => "read fields",
            Access::Put => "write fields",
            Access::Reset => "reset permission",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Access::Call => "call",
            Access::Get => "get",
            Access::Put => "put",
            Access::Reset => "reset",
        };

        f.write_str(name)
    }
}

pub trait Permission: Send + Sync + 'static {
    fn check_call(&self, target: &ObjectRef) -> Result<()>;
    fn check_get(&self, target: &ObjectRef) -> Result<()>;
    fn check_put(&self, target: &ObjectRef) -> Result<()>;

    /// Permissions are not resettable unless they say otherwise.
    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Reset, target, "permission cannot be reset"))
    }

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether evaluating this permission reads another object's permission.
    fn is_delegating(&self) -> bool {
        false
    }

    /// Whether evaluating this permission reads `slot`, directly or through
    /// further delegation.
    fn delegates_to(&self, _slot: &PermissionSlot) -> bool {
        false
    }

    fn check(&self, access: Access, target: &ObjectRef) -> Result<()> {
        match access {
            Access::Call => self.check_call(target),
            Access::Get => self.check_get(target),
            Access::Put => self.check_put(target),
            Access::Reset => self.check_reset(target),
        }
    }
}

impl fmt::Debug for dyn Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permission({})", self.name())
    }
}

/// Builds the violation every built-in permission reports.
pub fn denied(access: Access, target: &ObjectRef, cause: &str) -> Error {
    denied_for(&Task::current(), access, target, cause)
}

pub(crate) fn denied_for(task: &Task, access: Access, target: &ObjectRef, cause: &str) -> Error {
    Error::Violation(format!(
        "task '{}' cannot {} on '{}' ({})",
        task,
        access.describe(),
        target,
        cause
    ))
}

lazy_static! {
    static ref FROZEN: PermissionRef = Arc::new(Frozen);
    static ref ALWAYS_FAILS: PermissionRef = Arc::new(AlwaysFails);
    static ref THREAD_SAFE: PermissionRef = Arc::new(ThreadSafe);
    static ref PERMANENTLY_THREAD_SAFE: PermissionRef = Arc::new(PermanentlyThreadSafe);
}

/// Constructors for the built-in permissions.
pub struct Permissions;

impl Permissions {
    pub fn frozen() -> PermissionRef {
        FROZEN.clone()
    }

    pub fn always_fails() -> PermissionRef {
        ALWAYS_FAILS.clone()
    }

    pub fn thread_safe() -> PermissionRef {
        THREAD_SAFE.clone()
    }

    pub fn permanently_thread_safe() -> PermissionRef {
        PERMANENTLY_THREAD_SAFE.clone()
    }

    /// Private to the calling task.
    pub fn private() -> PermissionRef {
        Arc::new(Private::new())
    }

    pub fn private_to(task: &Task) -> PermissionRef {
        Arc::new(Private::for_task(task))
    }

    pub fn transfer() -> PermissionRef {
        Arc::new(Transfer::new())
    }

    /// Loaned out by the calling task.
    pub fn loan() -> PermissionRef {
        Arc::new(Loan::new())
    }

    pub fn same_as(leader: &dyn Protected) -> PermissionRef {
        Arc::new(SameAs::new(leader))
    }

    pub fn holds_lock(lock: Arc<dyn LockOwnership>) -> PermissionRef {
        Arc::new(HoldsLock::new(lock))
    }

    pub fn chained(first: PermissionRef, second: PermissionRef) -> PermissionRef {
        Arc::new(Chained::new(first, second))
    }

    /// Conjunction of all `perms`; an empty list is an error.
    pub fn compound<I>(perms: I) -> Result<PermissionRef>
    where
        I: IntoIterator<Item = PermissionRef>,
    {
        let mut iter = perms.into_iter();
        let first = iter.next().ok_or_else(|| {
            Error::invalid_argument("a compound permission needs at least one permission")
        })?;

        Ok(iter.fold(first, Self::chained))
    }
}
