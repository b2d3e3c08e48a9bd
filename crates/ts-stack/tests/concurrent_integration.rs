//! Multi-threaded behavior of the public stack API.
#![cfg(not(loom))]

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use ts_core::{PropertyChecker, StackPropertyChecker};
use ts_stack::{as_int, Kind, Stack, StackError, TrackedStack, TypedStack, UntypedStack};

const PUSHERS_COUNT: u64 = 6;
const VALUES_PER_PUSHER: u64 = 1_000;

#[test]
fn test_concurrent_pushers_then_poppers_conserve_values() {
    let stack = Arc::new(Stack::new());
    let barrier = Arc::new(Barrier::new(PUSHERS_COUNT as usize));

    let pushers: Vec<_> = (0..PUSHERS_COUNT)
        .map(|t| {
            let stack = Arc::clone(&stack);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for j in 0..VALUES_PER_PUSHER {
                    stack.push(t * VALUES_PER_PUSHER + j);
                }
            })
        })
        .collect();
    for handle in pushers {
        handle.join().unwrap();
    }
    assert_eq!(stack.size() as u64, PUSHERS_COUNT * VALUES_PER_PUSHER);

    let poppers: Vec<_> = (0..PUSHERS_COUNT)
        .map(|_| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                let mut popped = Vec::new();
                for _ in 0..VALUES_PER_PUSHER {
                    popped.push(stack.pop().expect("stack emptied early"));
                }
                popped
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in poppers {
        all.extend(handle.join().unwrap());
    }
    all.sort_unstable();
    let expected: Vec<u64> = (0..PUSHERS_COUNT * VALUES_PER_PUSHER).collect();
    assert_eq!(
        all, expected,
        "popped multiset differs from pushed multiset"
    );
    assert!(matches!(stack.pop(), Err(StackError::EmptyContainer(_))));
}

#[test]
fn test_interleaved_push_pop_drain_keeps_invariants() {
    let stack = Arc::new(TrackedStack::new());

    let workers: Vec<_> = (0..4_u64)
        .map(|t| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                for j in 0..300 {
                    stack.push(t * 10_000 + j);
                    match j % 7 {
                        0 | 3 => {
                            let _ = stack.pop();
                        }
                        5 => {
                            let _ = stack.pop_if(|top| top % 2 == 0);
                        }
                        _ => {}
                    }
                    if t == 0 && j % 100 == 99 {
                        stack.drain();
                    }
                }
            })
        })
        .collect();
    for handle in workers {
        handle.join().unwrap();
    }

    let checker = StackPropertyChecker::new(stack.as_ref());
    let violations = checker.violations();
    assert!(
        violations.is_empty(),
        "{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn test_typed_stack_shared_between_threads() {
    let stack = Arc::new(TypedStack::new(Kind::Integer));

    let handles: Vec<_> = (0..4_i64)
        .map(|t| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                let mut rejected = 0;
                for j in 0..250 {
                    stack.push(t * 1_000 + j).unwrap();
                    if stack.push("not an integer").is_err() {
                        rejected += 1;
                    }
                    if stack.push_json(serde_json::json!([j])).is_err() {
                        rejected += 1;
                    }
                }
                rejected
            })
        })
        .collect();

    let rejected: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(rejected, 4 * 250 * 2);
    assert_eq!(stack.size(), 1_000);

    let mut seen = HashSet::new();
    while !stack.is_empty() {
        assert!(seen.insert(as_int(stack.pop()).unwrap()));
    }
    assert_eq!(seen.len(), 1_000);
}

#[test]
fn test_untyped_stack_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<UntypedStack>();
    assert_send_sync::<TypedStack>();
    assert_send_sync::<Stack<String>>();
    assert_send_sync::<TrackedStack<u64>>();
}
