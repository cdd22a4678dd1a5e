//! Synchronizers that hand out permissions.
//!
//! Each synchronizer both coordinates tasks and describes, as a permission,
//! what it guarantees: a latch can mint a permission that holds only for tasks
//! that waited for it to open, a lock one that holds only while it is held.
//! Guarding shared data with those permissions turns a missed `wait` or a
//! forgotten `lock` into a violation at the offending access.

mod binary;
mod count_down;
mod one_time;
mod one_time_registration;
mod reentrant;
mod semaphore;
mod wait;

pub use binary::BinaryLatch;
pub use count_down::{CountDownLatch, CountDownRole};
pub use one_time::OneTimeLatch;
pub use one_time_registration::{LatchRole, OneTimeLatchRegistration};
pub use reentrant::ReentrantLock;
pub use semaphore::{DisjointSemaphore, SemaphoreRole};
pub use wait::WaitQueue;

pub(crate) fn ready_if(cond: bool) -> Option<()> {
    if cond {
        Some(())
    } else {
        None
    }
}
