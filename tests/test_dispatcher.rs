use std::thread;

use intents::{Config, Dispatcher, Error, Guarded, Permissions};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default)]
struct Account {
    balance: i64,
}

#[derive(Debug, Default)]
struct Ledger {
    entries: Vec<i64>,
}

#[test]
fn test_initialize_makes_object_private_to_creator() {
    init();

    let d = Dispatcher::default();
    let acct = Account::default();

    d.initialize(&acct).unwrap();
    d.check_get(&acct).unwrap();
    d.check_put(&acct).unwrap();
    d.check_call(&acct).unwrap();

    let err = thread::scope(|s| s.spawn(|| d.check_get(&acct)).join().unwrap()).unwrap_err();
    assert!(err.is_violation());
}

#[test]
fn test_initialize_is_idempotent() {
    init();

    let d = Dispatcher::default();
    let acct = Account::default();

    d.initialize(&acct).unwrap();
    d.set_permission(&acct, Permissions::frozen()).unwrap();
    d.initialize(&acct).unwrap();

    assert_eq!(d.permission_of(&acct).unwrap().name(), "frozen");
    assert_eq!(d.len(), 1);
}

#[test]
fn test_unguarded_objects() {
    init();

    let acct = Account::default();

    let lenient = Dispatcher::default();
    lenient.check_put(&acct).unwrap();
    assert!(!lenient.is_guarded(&acct));

    let strict = Dispatcher::new(Config {
        strict_unguarded: true,
        ..Config::default()
    });

    assert!(strict.check_put(&acct).unwrap_err().is_violation());
}

#[test]
fn test_frozen_shared_between_tasks() {
    init();

    let d = Dispatcher::default();
    let acct = Account { balance: 100 };

    d.initialize(&acct).unwrap();
    d.set_permission(&acct, Permissions::frozen()).unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            d.check_get(&acct).unwrap();
            d.check_call(&acct).unwrap();
            assert!(d.check_put(&acct).unwrap_err().is_violation());
            assert!(d
                .set_permission(&acct, Permissions::thread_safe())
                .unwrap_err()
                .is_violation());
        });
    });

    assert_eq!(acct.balance, 100);
}

#[test]
fn test_same_as_follows_leader_live() {
    init();

    let d = Dispatcher::default();
    let ledger = Ledger::default();
    let acct = Account::default();

    d.initialize(&ledger).unwrap();
    d.initialize(&acct).unwrap();
    d.same_permission_as(&acct, &ledger).unwrap();

    // leader is private to this task
    let err = thread::scope(|s| s.spawn(|| d.check_put(&acct)).join().unwrap()).unwrap_err();
    assert!(err.is_violation());

    d.set_permission(&ledger, Permissions::thread_safe()).unwrap();
    thread::scope(|s| s.spawn(|| d.check_put(&acct)).join().unwrap()).unwrap();

    d.set_permission(&ledger, Permissions::frozen()).unwrap();
    assert!(d.check_put(&acct).unwrap_err().is_violation());
    d.check_get(&acct).unwrap();

    // a follower is never reset
    assert!(d
        .set_permission(&acct, Permissions::thread_safe())
        .unwrap_err()
        .is_violation());
}

#[test]
fn test_same_as_requires_guarded_leader() {
    init();

    let d = Dispatcher::default();
    let ledger = Ledger::default();
    let acct = Account::default();

    let err = d.same_permission_as(&acct, &ledger).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_same_as_cycle_is_rejected() {
    init();

    let d = Dispatcher::default();
    let a = Account::default();
    let b = Ledger::default();

    d.initialize(&a).unwrap();
    d.initialize(&b).unwrap();

    assert!(d.same_permission_as(&a, &a).unwrap_err().is_violation());

    d.same_permission_as(&a, &b).unwrap();
    assert!(d.same_permission_as(&b, &a).unwrap_err().is_violation());

    // b keeps its own permission and a still follows it
    d.set_permission(&b, Permissions::frozen()).unwrap();
    assert!(d.check_put(&a).unwrap_err().is_violation());
}

#[test]
fn test_zero_sized_values_have_no_identity() {
    init();

    let d = Dispatcher::default();
    let unit = ();

    let err = d.initialize(&unit).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = d.set_permission(&unit, Permissions::frozen()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_compound_permission_on_side_table() {
    init();

    let d = Dispatcher::default();
    let acct = Account::default();

    d.initialize(&acct).unwrap();
    d.set_compound_permission(&acct, vec![Permissions::thread_safe(), Permissions::frozen()])
        .unwrap();

    d.check_get(&acct).unwrap();
    assert!(d.check_put(&acct).unwrap_err().is_violation());
}

#[test]
fn test_forget() {
    init();

    let d = Dispatcher::default();
    let acct = Account::default();

    assert!(!d.forget(&acct));

    d.initialize(&acct).unwrap();
    assert!(d.is_guarded(&acct));
    assert!(d.forget(&acct));
    assert!(d.is_empty());
}

#[test]
fn test_struct_and_first_field_are_distinct() {
    init();

    let d = Dispatcher::default();
    let acct = Account::default();

    d.initialize(&acct).unwrap();
    d.set_permission(&acct, Permissions::frozen()).unwrap();

    d.initialize(&acct.balance).unwrap();
    assert_eq!(d.permission_of(&acct.balance).unwrap().name(), "private");
    assert_eq!(d.len(), 2);
}

#[test]
fn test_wrapped_object_follows_tracked_leader() {
    init();

    let d = Dispatcher::default();
    let ledger = Ledger::default();
    d.initialize(&ledger).unwrap();

    let acct = Guarded::new(Account::default());
    acct.same_permission_as(&d.tracked(&ledger).unwrap()).unwrap();

    let other = acct.clone();
    let err = thread::spawn(move || other.get(|a| a.balance))
        .join()
        .unwrap()
        .unwrap_err();
    assert!(err.is_violation());

    d.set_permission(&ledger, Permissions::thread_safe()).unwrap();

    let other = acct.clone();
    thread::spawn(move || other.put(|a| a.balance = 3))
        .join()
        .unwrap()
        .unwrap();

    // and the other way round
    let follower = Account::default();
    d.initialize(&follower).unwrap();
    d.same_permission_as_protected(&follower, &acct).unwrap();
    d.check_put(&follower).unwrap();
}

#[test]
fn test_global_entry_points() {
    init();

    let acct = Box::new(Account::default());

    intents::initialize(&*acct).unwrap();
    intents::check_put(&*acct).unwrap();
    intents::set_permission(&*acct, Permissions::frozen()).unwrap();
    assert!(intents::check_put(&*acct).unwrap_err().is_violation());

    assert!(Dispatcher::global().forget(&*acct));
}
