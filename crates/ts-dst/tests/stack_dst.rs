//! Seeded simulation runs against the real stack.
//!
//! ```bash
//! DST_SEED=12345 DST_ITERATIONS=5000 cargo test -p ts-dst --test stack_dst
//! ```

use ts_dst::{get_or_generate_seed, iterations_from_env, DstHarness, HarnessConfig};
use ts_stack::{Stack, TrackedStack};

#[test]
fn test_dst_single_threaded() {
    let seed = get_or_generate_seed().unwrap();
    let config = HarnessConfig {
        operations_per_thread: iterations_from_env(1000).unwrap(),
        ..HarnessConfig::default()
    };
    let stack: TrackedStack<u64> = TrackedStack::new();

    let result = DstHarness::new(seed, config).run_single_threaded(&stack);

    assert!(result.all_invariants_held, "{}", result.format());
    println!("DST completed: {}", result.format());
}

#[test]
fn test_dst_concurrent_stress() {
    let seed = get_or_generate_seed().unwrap();
    let stack: TrackedStack<u64> = TrackedStack::new();

    let result = DstHarness::new(seed, HarnessConfig::stress()).run_concurrent(&stack);

    assert!(result.all_invariants_held, "{}", result.format());
    assert_eq!(result.operations_count, 8_000);
}

#[test]
fn test_dst_conservation() {
    let seed = get_or_generate_seed().unwrap();
    let stack: Stack<u64> = Stack::new();
    let config = HarnessConfig {
        threads_count: 8,
        operations_per_thread: iterations_from_env(1000).unwrap(),
        ..HarnessConfig::default()
    };

    let result = DstHarness::new(seed, config).run_conservation(&stack);

    assert!(result.all_invariants_held, "{}", result.format());
    assert!(stack.is_empty());
}
