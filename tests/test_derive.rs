use std::thread;

use intents::{derive::GuardedFields, Guarded, Permissions};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, GuardedFields)]
struct Point {
    x: i32,
    y: i32,
    #[intents(immutable)]
    id: u64,
    #[intents(skip)]
    #[allow(dead_code)]
    cache: Vec<u8>,
}

#[derive(GuardedFields)]
#[fields_trait("PairAccess")]
struct Pair<T> {
    left: T,
    right: T,
}

fn point() -> Guarded<Point> {
    Guarded::new(Point {
        x: 1,
        y: 2,
        id: 99,
        cache: Vec::new(),
    })
}

#[test]
fn test_generated_accessors() {
    init();

    let p = point();
    assert_eq!(p.x().unwrap(), 1);
    assert_eq!(p.y().unwrap(), 2);

    p.set_x(10).unwrap();
    p.set_y(20).unwrap();
    assert_eq!((p.x().unwrap(), p.y().unwrap()), (10, 20));
    assert_eq!(p.id(), 99);
}

#[test]
fn test_generated_accessors_are_checked() {
    init();

    let p = point();
    let other = p.clone();
    let (read, write, id) = thread::spawn(move || (other.x(), other.set_y(0), other.id()))
        .join()
        .unwrap();

    assert!(read.unwrap_err().is_violation());
    assert!(write.unwrap_err().is_violation());
    assert_eq!(id, 99);

    p.set_permission(Permissions::frozen()).unwrap();
    assert_eq!(p.y().unwrap(), 2);
    assert!(p.set_y(3).unwrap_err().is_violation());
}

#[test]
fn test_generic_struct_with_renamed_trait() {
    init();

    let pair = Guarded::new(Pair {
        left: String::from("l"),
        right: String::from("r"),
    });

    pair.set_left("L".into()).unwrap();
    assert_eq!(pair.left().unwrap(), "L");
    assert_eq!(pair.right().unwrap(), "r");
}
