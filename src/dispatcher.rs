//! Side table of permissions for objects that are not wrapped.
//!
//! Any value can be registered by reference; its identity is its address and
//! type. Accesses are reported explicitly through the `check_*` calls, which
//! makes this the integration point for code that cannot hold its data in a
//! [`Guarded`](crate::Guarded).

use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;
use log::{debug, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    object::ObjectRef,
    permission::{Access, PermissionRef, Permissions, SameAs},
    slot::{new_slot, PermissionSlot},
    task::Task,
    wrapper::Protected,
};

lazy_static! {
    static ref GLOBAL: Dispatcher = Dispatcher::new(Config::global().clone());
}

pub struct Dispatcher {
    config: Config,
    table: DashMap<ObjectRef, Arc<PermissionSlot>>,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            table: DashMap::new(),
        }
    }

    /// The process-wide dispatcher, configured from the environment.
    pub fn global() -> &'static Dispatcher {
        &GLOBAL
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts guarding `obj` with a permission private to the current task.
    /// Observing an object twice keeps its current permission.
    pub fn initialize<T: ?Sized>(&self, obj: &T) -> Result<()> {
        self.initialize_ref(ObjectRef::of(obj))
    }

    pub fn initialize_ref(&self, obj: ObjectRef) -> Result<()> {
        self.slot_or_init(obj).map(|_| ())
    }

    pub fn check_call<T: ?Sized>(&self, obj: &T) -> Result<()> {
        self.check(Access::Call, ObjectRef::of(obj))
    }

    pub fn check_get<T: ?Sized>(&self, obj: &T) -> Result<()> {
        self.check(Access::Get, ObjectRef::of(obj))
    }

    pub fn check_put<T: ?Sized>(&self, obj: &T) -> Result<()> {
        self.check(Access::Put, ObjectRef::of(obj))
    }

    pub fn check(&self, access: Access, obj: ObjectRef) -> Result<()> {
        match self.slot(&obj) {
            Some(slot) => slot.check(access, &obj),
            None if self.config.strict_unguarded => Err(Error::task_violation(format_args!(
                "cannot {} '{}': object is not guarded",
                access, obj
            ))),
            None => {
                debug!("unchecked {} on unguarded '{}'", access, obj);
                Ok(())
            }
        }
    }

    /// Replaces `obj`'s permission, registering the object first if needed.
    pub fn set_permission<T: ?Sized>(&self, obj: &T, permission: PermissionRef) -> Result<()> {
        let obj = ObjectRef::of(obj);
        let slot = self.slot_or_init(obj)?;
        slot.replace(permission, &obj, self.config.detect_same_as_cycles)
    }

    /// Makes `follower` follow `leader`'s permission for good.
    pub fn same_permission_as<F, L>(&self, follower: &F, leader: &L) -> Result<()>
    where
        F: ?Sized,
        L: ?Sized,
    {
        let leader = ObjectRef::of(leader);
        let leader_slot = self.slot(&leader).ok_or_else(|| {
            Error::invalid_argument(format!("cannot follow '{}': object is not guarded", leader))
        })?;

        self.set_permission(follower, Arc::new(SameAs::from_slot(leader_slot, leader)))
    }

    /// Makes `follower` follow a wrapped object's permission.
    pub fn same_permission_as_protected<F: ?Sized>(
        &self,
        follower: &F,
        leader: &dyn Protected,
    ) -> Result<()> {
        self.set_permission(follower, Permissions::same_as(leader))
    }

    pub fn set_compound_permission<T, I>(&self, obj: &T, permissions: I) -> Result<()>
    where
        T: ?Sized,
        I: IntoIterator<Item = PermissionRef>,
    {
        self.set_permission(obj, Permissions::compound(permissions)?)
    }

    pub fn permission_of<T: ?Sized>(&self, obj: &T) -> Option<PermissionRef> {
        self.slot(&ObjectRef::of(obj)).map(|slot| slot.load())
    }

    pub fn is_guarded<T: ?Sized>(&self, obj: &T) -> bool {
        self.table.contains_key(&ObjectRef::of(obj))
    }

    /// A handle to a registered object's permission, usable as a same-as
    /// leader for wrapped objects.
    pub fn tracked<T: ?Sized>(&self, obj: &T) -> Option<Tracked> {
        let object = ObjectRef::of(obj);
        self.slot(&object).map(|slot| Tracked { slot, object })
    }

    /// Stops guarding `obj`; call it before the object's memory is reused.
    pub fn forget<T: ?Sized>(&self, obj: &T) -> bool {
        let obj = ObjectRef::of(obj);
        if self.table.remove(&obj).is_some() {
            debug!("forgot '{}'", obj);
            true
        } else {
            warn!("cannot forget '{}': object is not guarded", obj);
            false
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn slot(&self, obj: &ObjectRef) -> Option<Arc<PermissionSlot>> {
        self.table.get(obj).map(|entry| entry.value().clone())
    }

    fn slot_or_init(&self, obj: ObjectRef) -> Result<Arc<PermissionSlot>> {
        if obj.is_zero_sized() {
            return Err(Error::invalid_argument(format!(
                "cannot guard zero-sized '{}': it has no identity",
                obj
            )));
        }

        if let Some(slot) = self.slot(&obj) {
            return Ok(slot);
        }

        let slot = self
            .table
            .entry(obj)
            .or_insert_with(|| {
                let task = Task::current();
                debug!("guarding '{}' as private to {}", obj, task);
                new_slot(Permissions::private_to(&task))
            })
            .value()
            .clone();

        Ok(slot)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// A registered object's permission slot paired with its identity.
#[derive(Clone, Debug)]
pub struct Tracked {
    slot: Arc<PermissionSlot>,
    object: ObjectRef,
}

impl Protected for Tracked {
    fn permission_slot(&self) -> Arc<PermissionSlot> {
        self.slot.clone()
    }

    fn object_ref(&self) -> ObjectRef {
        self.object
    }
}

pub fn initialize<T: ?Sized>(obj: &T) -> Result<()> {
    Dispatcher::global().initialize(obj)
}

pub fn check_call<T: ?Sized>(obj: &T) -> Result<()> {
    Dispatcher::global().check_call(obj)
}

pub fn check_get<T: ?Sized>(obj: &T) -> Result<()> {
    Dispatcher::global().check_get(obj)
}

pub fn check_put<T: ?Sized>(obj: &T) -> Result<()> {
    Dispatcher::global().check_put(obj)
}

pub fn set_permission<T: ?Sized>(obj: &T, permission: PermissionRef) -> Result<()> {
    Dispatcher::global().set_permission(obj, permission)
}

pub fn same_permission_as<F: ?Sized, L: ?Sized>(follower: &F, leader: &L) -> Result<()> {
    Dispatcher::global().same_permission_as(follower, leader)
}

pub fn set_compound_permission<T, I>(obj: &T, permissions: I) -> Result<()>
where
    T: ?Sized,
    I: IntoIterator<Item = PermissionRef>,
{
    Dispatcher::global().set_compound_permission(obj, permissions)
}
