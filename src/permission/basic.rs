use super::{denied, Access, Permission};
use crate::{error::Result, object::ObjectRef};

/// Fails every check, including reset.
pub struct AlwaysFails;

impl Permission for AlwaysFails {
    fn check_call(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Call, target, "always fails"))
    }

    fn check_get(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Get, target, "always fails"))
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Put, target, "always fails"))
    }

    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Reset, target, "always fails"))
    }

    fn name(&self) -> &str {
        "always-fails"
    }
}

/// Read-only for everyone, forever.
pub struct Frozen;

impl Permission for Frozen {
    fn check_call(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_get(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Put, target, "object is frozen"))
    }

    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        Err(denied(Access::Reset, target, "object is frozen"))
    }

    fn name(&self) -> &str {
        "frozen"
    }
}

/// The object synchronizes internally; every access passes and the
/// permission may later be replaced.
pub struct ThreadSafe;

impl Permission for ThreadSafe {
    fn check_call(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_get(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_put(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_reset(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "thread-safe"
    }
}

/// Like [`ThreadSafe`] but can never be replaced.
pub struct PermanentlyThreadSafe;

impl Permission for PermanentlyThreadSafe {
    fn check_call(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_get(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn check_put(&self, _: &ObjectRef) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "permanently-thread-safe"
    }
}
