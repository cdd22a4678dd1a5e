use std::fmt;

use super::TaskLocal;
use crate::error::{Error, Result};

/// A role a task can take on with a synchronizer.
pub trait Role: Copy + Eq + fmt::Display + Send + Sync + 'static {}

impl<R> Role for R where R: Copy + Eq + fmt::Display + Send + Sync + 'static {}

/// Records which single role each task registered for.
///
/// Roles are disjoint: a task registers once and keeps that role for the
/// lifetime of the registry.
pub struct RoleRegistry<R: Role> {
    roles: TaskLocal<Option<R>>,
}

impl<R: Role> RoleRegistry<R> {
    pub fn new() -> Self {
        Self {
            roles: TaskLocal::with_initial(None),
        }
    }

    /// Fails if the current task could not register as `role`.
    pub fn ensure_can_register(&self, role: R) -> Result<()> {
        match self.roles.get() {
            None => Ok(()),
            Some(current) if current == role => Err(Error::task_violation(format_args!(
                "cannot re-register as {}",
                role
            ))),
            Some(current) => Err(Error::task_violation(format_args!(
                "cannot register as {}: already registered as {}",
                role, current
            ))),
        }
    }

    pub fn register(&self, role: R) -> Result<()> {
        self.ensure_can_register(role)?;
        self.roles.set(Some(role));
        Ok(())
    }

    pub fn role(&self) -> Option<R> {
        self.roles.get()
    }

    #[inline]
    pub fn is(&self, role: R) -> bool {
        self.role() == Some(role)
    }

    /// Fails unless the current task registered as `role`.
    pub fn check(&self, role: R) -> Result<()> {
        match self.role() {
            Some(current) if current == role => Ok(()),
            Some(current) => Err(Error::task_violation(format_args!(
                "is registered as {}, not {}",
                current, role
            ))),
            None => Err(Error::task_violation(format_args!(
                "is not registered as {}",
                role
            ))),
        }
    }
}

impl<R: Role> Default for RoleRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
