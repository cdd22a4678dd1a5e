//! Handles that own their data and check every access against their
//! permission.

mod guarded;
mod proxy;

use std::sync::Arc;

use crate::{object::ObjectRef, slot::PermissionSlot};

pub use guarded::Guarded;
pub use proxy::Proxy;

/// An object with a permission slot, usable as a same-as leader.
pub trait Protected {
    fn permission_slot(&self) -> Arc<PermissionSlot>;
    fn object_ref(&self) -> ObjectRef;
}
