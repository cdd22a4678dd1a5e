//! Intents: checked concurrency intentions for shared data.
//!
//! Every guarded object carries a permission saying which tasks may call its
//! methods, read its fields and write its fields. Every access is checked
//! against the current permission, and an access that breaks the declared
//! protocol fails immediately with [`Error::Violation`] instead of becoming a
//! silent data race.
//!
//! Data is guarded either by wrapping it ([`Guarded`], [`Proxy`]) or by
//! registering it with a [`Dispatcher`] and reporting accesses through
//! [`check_call`], [`check_get`] and [`check_put`]. The synchronizers in
//! [`sync`] and the [`executor`] mint permissions describing what they
//! guarantee, so guarded data can be tied to a latch, a lock or a task's
//! completion.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod object;
pub mod permission;
pub mod permit;
pub mod slot;
pub mod sync;
pub mod task;
pub mod wrapper;

pub mod derive {
    pub use intents_derive::GuardedFields;
}

pub use config::Config;
pub use dispatcher::{
    check_call, check_get, check_put, initialize, same_permission_as, set_compound_permission,
    set_permission, Dispatcher, Tracked,
};
pub use error::{Error, Result};
pub use executor::{FutureTask, TaskExecutor};
pub use object::ObjectRef;
pub use permission::{Access, Permission, PermissionRef, Permissions};
pub use permit::Permit;
pub use task::{Task, TaskId, TaskLocal};
pub use wrapper::{Guarded, Protected, Proxy};
