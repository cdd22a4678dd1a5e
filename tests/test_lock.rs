use std::{
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

use intents::{sync::ReentrantLock, Error, Guarded, Permissions, Task};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_reentrant_hold_count() {
    init();

    let lock = ReentrantLock::new();
    assert_eq!(lock.hold_count(), 0);

    lock.lock().unwrap();
    lock.lock().unwrap();
    assert!(lock.try_lock());
    assert_eq!(lock.hold_count(), 3);
    assert!(lock.is_held_by_current_thread());

    lock.unlock().unwrap();
    lock.unlock().unwrap();
    assert!(lock.is_locked());

    lock.unlock().unwrap();
    assert!(!lock.is_locked());
    assert_eq!(lock.hold_count(), 0);

    assert!(lock.unlock().unwrap_err().is_violation());
}

#[test]
fn test_unlock_by_non_owner_is_a_violation() {
    init();

    let lock = ReentrantLock::new();
    lock.lock().unwrap();

    let other = lock.clone();
    let (unlock, try_lock, hold_count) = thread::spawn(move || {
        (other.unlock(), other.try_lock(), other.hold_count())
    })
    .join()
    .unwrap();

    assert!(unlock.unwrap_err().is_violation());
    assert!(!try_lock);
    assert_eq!(hold_count, 0);

    lock.unlock().unwrap();
}

#[test]
fn test_try_lock_for_times_out() {
    init();

    let lock = ReentrantLock::new();
    lock.lock().unwrap();

    let other = lock.clone();
    let got = thread::spawn(move || other.try_lock_for(Duration::from_millis(30)))
        .join()
        .unwrap()
        .unwrap();

    assert!(!got);
    lock.unlock().unwrap();
}

#[test]
fn test_unlock_hands_over_to_waiter() {
    init();

    let lock = ReentrantLock::new();
    let counter = Arc::new(Guarded::new(0u32));
    counter.set_permission(lock.locked_permission()).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let lock = lock.clone();
            let counter = counter.clone();

            thread::spawn(move || {
                for _ in 0..100 {
                    lock.lock().unwrap();
                    counter.put(|v| *v += 1).unwrap();
                    lock.unlock().unwrap();
                }
            })
        })
        .collect();

    for handle in workers {
        handle.join().unwrap();
    }

    lock.lock().unwrap();
    assert_eq!(counter.get(|v| *v).unwrap(), 400);
    lock.unlock().unwrap();

    assert!(counter.get(|v| *v).unwrap_err().is_violation());
}

#[test]
fn test_blocked_lock_is_interruptible() {
    init();

    let lock = ReentrantLock::new();
    lock.lock().unwrap();

    let (tx, rx) = mpsc::channel();
    let contender = lock.clone();
    let task = Task::new(move || {
        tx.send(contender.lock()).unwrap();
    });

    let handle = task.spawn().unwrap();
    thread::sleep(Duration::from_millis(30));
    task.interrupt();

    let res = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(res, Err(Error::Interrupted));
    assert!(lock.is_held_by_current_thread());

    handle.join().unwrap().unwrap();
    lock.unlock().unwrap();
}

#[test]
fn test_holds_lock_built_from_ownership() {
    init();

    let lock = ReentrantLock::new();
    let data = Guarded::new(5i32);
    data.set_permission(Permissions::holds_lock(lock.ownership()))
        .unwrap();

    assert!(data.get(|v| *v).is_err());

    lock.lock().unwrap();
    assert_eq!(data.get(|v| *v).unwrap(), 5);
    lock.unlock().unwrap();
}
