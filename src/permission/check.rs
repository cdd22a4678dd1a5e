use std::borrow::Cow;

use super::{denied_for, Access, Permission};
use crate::{error::Result, object::ObjectRef, task::Task};

type Predicate = Box<dyn Fn(&Task) -> std::result::Result<(), Cow<'static, str>> + Send + Sync>;

/// Applies one predicate about the current task to every access kind.
///
/// Synchronizers hand these out to describe facts like "the latch is open
/// and this task waited for it".
pub struct CheckPermission {
    name: Cow<'static, str>,
    resettable: bool,
    check: Predicate,
}

impl CheckPermission {
    /// `check` returns the cause of the denial on failure.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, check: F) -> Self
    where
        F: Fn(&Task) -> std::result::Result<(), Cow<'static, str>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            resettable: false,
            check: Box::new(check),
        }
    }

    pub fn from_predicate<F>(name: impl Into<Cow<'static, str>>, cause: &'static str, pred: F) -> Self
    where
        F: Fn(&Task) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |task| if pred(task) { Ok(()) } else { Err(cause.into()) })
    }

    /// Lets the permission be replaced by any task the predicate accepts.
    pub fn resettable(mut self) -> Self {
        self.resettable = true;
        self
    }

    fn check_access(&self, access: Access, target: &ObjectRef) -> Result<()> {
        let task = Task::current();
        (self.check)(&task).map_err(|cause| denied_for(&task, access, target, &cause))
    }
}

impl Permission for CheckPermission {
    fn check_call(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Call, target)
    }

    fn check_get(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Get, target)
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Put, target)
    }

    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        if self.resettable {
            self.check_access(Access::Reset, target)
        } else {
            Err(denied_for(
                &Task::current(),
                Access::Reset,
                target,
                "permission cannot be reset",
            ))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
