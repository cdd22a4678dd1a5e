use std::sync::atomic::{AtomicU64, Ordering};

use super::{denied_for, Access, Permission};
use crate::{
    error::Result,
    object::ObjectRef,
    task::{Task, TaskId},
};

/// Every access and the reset belong to a single task.
pub struct Private {
    owner: TaskId,
}

impl Private {
    pub fn new() -> Self {
        Self::for_task(&Task::current())
    }

    pub fn for_task(task: &Task) -> Self {
        Self { owner: task.id() }
    }

    pub fn owner(&self) -> TaskId {
        self.owner
    }

    fn check_access(&self, access: Access, target: &ObjectRef) -> Result<()> {
        let task = Task::current();
        if task.id() == self.owner {
            Ok(())
        } else {
            Err(denied_for(
                &task,
                access,
                target,
                &format!("object is private to task {}", self.owner),
            ))
        }
    }
}

impl Default for Private {
    fn default() -> Self {
        Self::new()
    }
}

impl Permission for Private {
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
        self.check_access(Access::Reset, target)
    }

    fn name(&self) -> &str {
        "private"
    }
}

/// Unbound until the first task to access the object claims it; from then on
/// behaves like [`Private`] for that task.
pub struct Transfer {
    owner: AtomicU64,
}

impl Transfer {
    pub fn new() -> Self {
        Self {
            owner: AtomicU64::new(TaskId::UNBOUND),
        }
    }

    /// Current owner, `None` while nobody has touched the object.
    pub fn owner(&self) -> Option<TaskId> {
        TaskId::from_raw(self.owner.load(Ordering::Acquire))
    }

    fn acquire(&self, caller: TaskId) -> bool {
        let owner = self.owner.load(Ordering::Acquire);
        if owner == caller.as_u64() {
            return true;
        }

        owner == TaskId::UNBOUND
            && self
                .owner
                .compare_exchange(
                    TaskId::UNBOUND,
                    caller.as_u64(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    fn check_access(&self, access: Access, target: &ObjectRef) -> Result<()> {
        let task = Task::current();
        if self.acquire(task.id()) {
            Ok(())
        } else {
            Err(denied_for(&task, access, target, "object was transferred to another task"))
        }
    }
}

impl Default for Transfer {
    fn default() -> Self {
        Self::new()
    }
}

impl Permission for Transfer {
    fn check_call(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Call, target)
    }

    fn check_get(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Get, target)
    }

    fn check_put(&self, target: &ObjectRef) -> Result<()> {
        self.check_access(Access::Put, target)
    }

    /// Only an owner that already claimed the object may replace the
    /// permission; resetting never claims.
    fn check_reset(&self, target: &ObjectRef) -> Result<()> {
        let task = Task::current();
        match self.owner() {
            Some(owner) if owner == task.id() => Ok(()),
            Some(_) => Err(denied_for(
                &task,
                Access::Reset,
                target,
                "object was transferred to another task",
            )),
            None => Err(denied_for(
                &task,
                Access::Reset,
                target,
                "object has not been claimed yet",
            )),
        }
    }

    fn name(&self) -> &str {
        "transfer"
    }
}

/// The owner lends the object to one borrower at a time.
///
/// The first non-owner task to access an unclaimed loan becomes the borrower.
/// Any access by the owner takes the object back for good: afterwards no
/// other task can borrow it.
pub struct Loan {
    owner: TaskId,
    borrower: AtomicU64,
}

impl Loan {
    pub fn new() -> Self {
        Self::for_task(&Task::current())
    }

    pub fn for_task(owner: &Task) -> Self {
        Self {
            owner: owner.id(),
            borrower: AtomicU64::new(TaskId::UNBOUND),
        }
    }

    pub fn owner(&self) -> TaskId {
        self.owner
    }

    pub fn borrower(&self) -> Option<TaskId> {
        TaskId::from_raw(self.borrower.load(Ordering::Acquire))
    }

    fn acquire(&self, caller: TaskId) -> bool {
        if caller == self.owner {
            if self.borrower.load(Ordering::Acquire) != self.owner.as_u64() {
                self.borrower.store(self.owner.as_u64(), Ordering::Release);
            }

            return true;
        }

        let borrower = self.borrower.load(Ordering::Acquire);
        if borrower == caller.as_u64() {
            return true;
        }

        borrower == TaskId::UNBOUND
            && self
                .borrower
                .compare_exchange(
                    TaskId::UNBOUND,
                    caller.as_u64(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    fn check_access(&self, access: Access, target: &ObjectRef) -> Result<()> {
        let task = Task::current();
        if self.acquire(task.id()) {
            Ok(())
        } else {
            Err(denied_for(&task, access, target, "object is loaned to another task"))
        }
    }
}

impl Default for Loan {
    fn default() -> Self {
        Self::new()
    }
}

impl Permission for Loan {
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
        let task = Task::current();
        if task.id() != self.owner {
            return Err(denied_for(
                &task,
                Access::Reset,
                target,
                "only the lending task may reset a loan",
            ));
        }

        self.borrower.store(self.owner.as_u64(), Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "loan"
    }
}
