use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc, Arc, Barrier,
    },
    thread,
};

use intents::{
    permission::CheckPermission, sync::ReentrantLock, Error, Guarded, Permissions, Task,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn on_other_task<R, F>(f: F) -> R
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    thread::spawn(f).join().unwrap()
}

#[derive(Debug, Default)]
struct Account {
    balance: i64,
}

#[test]
fn test_frozen_allows_reads_and_calls_only() {
    init();

    let acct = Guarded::new(Account { balance: 10 });
    acct.set_permission(Permissions::frozen()).unwrap();

    let other = acct.clone();
    let (read, call, write, reset) = on_other_task(move || {
        (
            other.get(|a| a.balance),
            other.call(|a| a.balance * 2),
            other.put(|a| a.balance = 0),
            other.set_permission(Permissions::thread_safe()),
        )
    });

    assert_eq!(read.unwrap(), 10);
    assert_eq!(call.unwrap(), 20);
    assert!(write.unwrap_err().is_violation());
    assert!(reset.unwrap_err().is_violation());

    // frozen binds the creator too
    assert!(acct.put(|a| a.balance = 1).unwrap_err().is_violation());
    assert!(acct.set_permission(Permissions::private()).is_err());
}

#[test]
fn test_always_fails() {
    init();

    let acct = Guarded::with_permission(Account::default(), Permissions::always_fails());

    assert!(acct.get(|a| a.balance).unwrap_err().is_violation());
    assert!(acct.call(|_| ()).unwrap_err().is_violation());
    assert!(acct.put(|a| a.balance = 1).unwrap_err().is_violation());
    assert!(acct.set_permission(Permissions::thread_safe()).is_err());
}

#[test]
fn test_thread_safe_resettable_permanently_thread_safe_not() {
    init();

    let acct = Guarded::with_permission(Account::default(), Permissions::thread_safe());
    let other = acct.clone();
    on_other_task(move || other.put(|a| a.balance += 5)).unwrap();
    acct.set_permission(Permissions::frozen()).unwrap();

    let perm = Guarded::with_permission(Account::default(), Permissions::permanently_thread_safe());
    let other = perm.clone();
    on_other_task(move || other.put(|a| a.balance += 5)).unwrap();
    assert!(perm.set_permission(Permissions::frozen()).unwrap_err().is_violation());
}

#[test]
fn test_private_rejects_other_tasks() {
    init();

    let acct = Guarded::new(Account { balance: 3 });
    assert_eq!(acct.get(|a| a.balance).unwrap(), 3);
    acct.put(|a| a.balance = 4).unwrap();

    let other = acct.clone();
    let err = on_other_task(move || other.get(|a| a.balance)).unwrap_err();
    assert!(err.is_violation());

    let other = acct.clone();
    let err = on_other_task(move || other.set_permission(Permissions::thread_safe())).unwrap_err();
    assert!(err.is_violation());
}

#[test]
fn test_violation_message_names_task_operation_and_object() {
    init();

    let acct = Guarded::with_permission(Account::default(), Permissions::frozen());
    let err = acct.put(|a| a.balance = 1).unwrap_err();

    match err {
        Error::Violation(msg) => {
            assert!(msg.starts_with("task 'task#"), "{}", msg);
            assert!(msg.contains("cannot write fields on '"), "{}", msg);
            assert!(msg.contains("Account@0x"), "{}", msg);
            assert!(msg.ends_with("(object is frozen)"), "{}", msg);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_transfer_binds_to_first_task() {
    init();

    let acct = Guarded::new(Account::default());
    acct.set_permission(Permissions::transfer()).unwrap();

    let (tx, rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();
    let other = acct.clone();
    let handle = thread::spawn(move || {
        done_tx.send(other.put(|a| a.balance = 7)).unwrap();
        rx.recv().unwrap();
        other.get(|a| a.balance)
    });

    done_rx.recv().unwrap().unwrap();
    assert!(acct.get(|a| a.balance).unwrap_err().is_violation());
    assert!(acct.set_permission(Permissions::frozen()).unwrap_err().is_violation());

    tx.send(()).unwrap();
    assert_eq!(handle.join().unwrap().unwrap(), 7);
}

#[test]
fn test_transfer_race_has_exactly_one_winner() {
    init();

    const TASKS: usize = 8;

    let acct = Guarded::with_permission(Account::default(), Permissions::transfer());
    let barrier = Arc::new(Barrier::new(TASKS));
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let acct = acct.clone();
            let barrier = barrier.clone();
            let winners = winners.clone();

            thread::spawn(move || {
                barrier.wait();
                if acct.put(|a| a.balance += 1).is_ok() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
}

#[test]
fn test_transfer_reset_needs_a_claimed_owner() {
    init();

    let acct = Guarded::new(Account::default());
    acct.set_permission(Permissions::transfer()).unwrap();

    assert!(acct.set_permission(Permissions::frozen()).unwrap_err().is_violation());

    acct.get(|a| a.balance).unwrap();
    acct.set_permission(Permissions::frozen()).unwrap();
}

#[test]
fn test_loan_borrow_reacquire_and_reset() {
    init();

    let acct = Guarded::new(Account::default());
    acct.set_permission(Permissions::loan()).unwrap();

    let (go_tx, go_rx) = mpsc::channel::<()>();
    let (borrowed_tx, borrowed_rx) = mpsc::channel();
    let borrower = acct.clone();
    let handle = thread::spawn(move || {
        borrowed_tx.send(borrower.put(|a| a.balance = 1)).unwrap();
        go_rx.recv().unwrap();

        (
            borrower.get(|a| a.balance),
            borrower.set_permission(Permissions::thread_safe()),
        )
    });

    borrowed_rx.recv().unwrap().unwrap();

    // a third task cannot borrow while the loan is out
    let third = acct.clone();
    assert!(on_other_task(move || third.get(|a| a.balance)).unwrap_err().is_violation());

    // the owner takes it back
    assert_eq!(acct.get(|a| a.balance).unwrap(), 1);

    go_tx.send(()).unwrap();
    let (read, reset) = handle.join().unwrap();
    assert!(read.unwrap_err().is_violation());
    assert!(reset.unwrap_err().is_violation());

    acct.set_permission(Permissions::frozen()).unwrap();
}

#[test]
fn test_chained_and_compound() {
    init();

    let acct = Guarded::new(Account::default());
    acct.set_permission(Permissions::chained(
        Permissions::thread_safe(),
        Permissions::frozen(),
    ))
    .unwrap();

    assert!(acct.get(|a| a.balance).is_ok());
    assert!(acct.put(|a| a.balance = 1).unwrap_err().is_violation());

    let empty = Guarded::new(Account::default());
    let err = empty.set_compound_permission(Vec::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    empty
        .set_compound_permission(vec![Permissions::private(), Permissions::thread_safe()])
        .unwrap();

    let other = empty.clone();
    assert!(on_other_task(move || other.get(|a| a.balance)).unwrap_err().is_violation());
    assert_eq!(empty.get(|a| a.balance).unwrap(), 0);
}

#[test]
fn test_check_permission_predicate() {
    init();

    let ready = Arc::new(AtomicBool::new(false));
    let flag = ready.clone();
    let perm = Arc::new(CheckPermission::from_predicate(
        "ready",
        "not ready yet",
        move |_| flag.load(Ordering::SeqCst),
    ));

    let acct = Guarded::new(Account::default());
    acct.set_permission(perm).unwrap();

    let err = acct.get(|a| a.balance).unwrap_err();
    assert!(err.to_string().contains("not ready yet"));

    ready.store(true, Ordering::SeqCst);
    acct.put(|a| a.balance = 2).unwrap();

    // not resettable unless asked for
    assert!(acct.set_permission(Permissions::thread_safe()).is_err());

    let me = Task::current().id();
    let resettable = Arc::new(
        CheckPermission::from_predicate("mine", "not mine", move |task| task.id() == me)
            .resettable(),
    );

    let other = Guarded::new(Account::default());
    other.set_permission(resettable).unwrap();
    other.set_permission(Permissions::thread_safe()).unwrap();
}

#[test]
fn test_holds_lock() {
    init();

    let lock = ReentrantLock::new();
    let acct = Guarded::new(Account::default());
    acct.set_permission(lock.locked_permission()).unwrap();

    assert!(acct.get(|a| a.balance).unwrap_err().is_violation());

    lock.lock().unwrap();
    acct.put(|a| a.balance = 9).unwrap();

    let other = acct.clone();
    assert!(on_other_task(move || other.get(|a| a.balance)).unwrap_err().is_violation());

    lock.unlock().unwrap();
    assert!(acct.get(|a| a.balance).unwrap_err().is_violation());

    let other = acct.clone();
    let other_lock = lock.clone();
    let read = on_other_task(move || {
        other_lock.lock().unwrap();
        let read = other.get(|a| a.balance);
        other_lock.unlock().unwrap();
        read
    });

    assert_eq!(read.unwrap(), 9);
}
