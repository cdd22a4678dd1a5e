use std::{
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, Thread},
    time::Instant,
};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    task::Task,
};

struct Waiter {
    ticket: u64,
    thread: Thread,
}

/// Parks threads until a condition becomes true.
///
/// Waiters register before re-checking the condition, and releasers change
/// state before calling [`WaitQueue::wake_all`], so no wake-up is lost.
pub struct WaitQueue {
    waiters: Mutex<SmallVec<[Waiter; 4]>>,
    next_ticket: AtomicU64,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(SmallVec::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Blocks until `ready` yields a value.
    ///
    /// Returns `Ok(None)` when `deadline` passes first, and
    /// [`Error::Interrupted`] when the current task gets interrupted. The
    /// interrupt flag is consumed.
    pub fn wait_until<T, F>(&self, mut ready: F, deadline: Option<Instant>) -> Result<Option<T>>
    where
        F: FnMut() -> Option<T>,
    {
        let task = Task::current();
        if task.take_interrupt() {
            return Err(Error::Interrupted);
        }

        if let Some(val) = ready() {
            return Ok(Some(val));
        }

        let ticket = self.register();
        let _registered = Registered {
            queue: self,
            ticket,
        };

        loop {
            if let Some(val) = ready() {
                return Ok(Some(val));
            }

            if task.take_interrupt() {
                return Err(Error::Interrupted);
            }

            match deadline {
                None => thread::park(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }

                    thread::park_timeout(deadline - now);
                }
            }
        }
    }

    pub fn wake_all(&self) {
        for waiter in self.waiters.lock().iter() {
            waiter.thread.unpark();
        }
    }

    pub fn waiting(&self) -> usize {
        self.waiters.lock().len()
    }

    fn register(&self) -> u64 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.waiters.lock().push(Waiter {
            ticket,
            thread: thread::current(),
        });

        ticket
    }

    fn deregister(&self, ticket: u64) {
        self.waiters.lock().retain(|w| w.ticket != ticket);
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

struct Registered<'a> {
    queue: &'a WaitQueue,
    ticket: u64,
}

impl Drop for Registered<'_> {
    fn drop(&mut self) {
        self.queue.deregister(self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{atomic::AtomicBool, Arc},
        time::Duration,
    };

    #[test]
    fn deadline_expires_and_deregisters() {
        let queue = WaitQueue::new();
        let deadline = Instant::now() + Duration::from_millis(10);

        let res = queue.wait_until(|| None::<()>, Some(deadline)).unwrap();
        assert!(res.is_none());
        assert_eq!(queue.waiting(), 0);
    }

    #[test]
    fn wake_all_releases_waiter() {
        let queue = Arc::new(WaitQueue::new());
        let flag = Arc::new(AtomicBool::new(false));

        let waiter = {
            let queue = queue.clone();
            let flag = flag.clone();
            thread::spawn(move || {
                queue.wait_until(|| flag.load(Ordering::Acquire).then(|| 7), None)
            })
        };

        thread::sleep(Duration::from_millis(20));
        flag.store(true, Ordering::Release);
        queue.wake_all();

        assert_eq!(waiter.join().unwrap().unwrap(), Some(7));
    }
}
