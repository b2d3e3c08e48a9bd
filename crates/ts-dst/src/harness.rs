//! DST harness for running reproducible stack tests.
//!
//! The harness drives any [`DstTestableStack`] with a seeded mix of
//! operations and checks the stack invariants from `ts-core`:
//! - `run_single_threaded`: one operation stream, invariants checked every
//!   `invariant_check_interval` operations
//! - `run_concurrent`: one OS thread per stream, invariants checked once
//!   the stack is quiescent
//! - `run_conservation`: concurrent pushers, then concurrent poppers; the
//!   popped multiset must equal the pushed multiset
//!
//! Operation streams are fully determined by the seed. Thread interleaving
//! in the concurrent runs is up to the OS scheduler and is not reproducible.

use std::thread;

use ts_core::{
    Counterexample, PropertyChecker, PropertyResult, StackProperties, StackPropertyChecker,
};
use ts_stack::{Stack, TrackedStack};

use crate::random::DeterministicRng;

/// Bits reserved for the per-thread counter in generated values.
const VALUE_THREAD_SHIFT: u32 = 40;

/// Maximum number of simulated threads.
const THREADS_COUNT_MAX: usize = 64;

/// Relative frequency of each generated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpWeights {
    pub push: u32,
    pub pop: u32,
    pub peek: u32,
    pub pop_if: u32,
    pub drain: u32,
}

impl OpWeights {
    fn total(&self) -> u32 {
        self.push + self.pop + self.peek + self.pop_if + self.drain
    }
}

impl Default for OpWeights {
    fn default() -> Self {
        Self {
            push: 45,
            pop: 35,
            peek: 10,
            pop_if: 9,
            drain: 1,
        }
    }
}

/// Configuration for the DST harness.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Number of operation streams (threads in the concurrent runs)
    pub threads_count: usize,
    /// Number of operations per stream
    pub operations_per_thread: u64,
    /// Operation mix
    pub weights: OpWeights,
    /// Check invariants after every N operations (0 = only at the end)
    pub invariant_check_interval: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            threads_count: 4,
            operations_per_thread: 100,
            weights: OpWeights::default(),
            invariant_check_interval: 10,
        }
    }
}

impl HarnessConfig {
    /// Configuration for stress testing.
    #[must_use]
    pub fn stress() -> Self {
        Self {
            threads_count: 8,
            operations_per_thread: 1000,
            weights: OpWeights::default(),
            invariant_check_interval: 100,
        }
    }

    /// Configuration for quick testing.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            threads_count: 2,
            operations_per_thread: 50,
            weights: OpWeights::default(),
            invariant_check_interval: 10,
        }
    }
}

/// Operation a stream performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOp {
    Push(u64),
    Pop,
    Peek,
    /// Pop only if the top is even
    PopIfEven,
    Drain,
}

/// Minimal stack interface the harness drives.
///
/// Results are reduced to `Option`: the harness cares about values, not
/// about which error an empty stack produced.
pub trait DstTestableStack: Send + Sync {
    fn push(&self, value: u64);
    fn pop(&self) -> Option<u64>;
    fn peek(&self) -> Option<u64>;
    /// Pop the top only if `predicate` accepts it, atomically.
    fn pop_if(&self, predicate: &dyn Fn(u64) -> bool) -> Option<u64>;
    fn drain(&self);
    fn size(&self) -> usize;
}

impl DstTestableStack for Stack<u64> {
    fn push(&self, value: u64) {
        Stack::push(self, value);
    }

    fn pop(&self) -> Option<u64> {
        Stack::pop(self).ok()
    }

    fn peek(&self) -> Option<u64> {
        Stack::peek(self).ok()
    }

    fn pop_if(&self, predicate: &dyn Fn(u64) -> bool) -> Option<u64> {
        Stack::pop_if(self, |top| predicate(*top)).ok().flatten()
    }

    fn drain(&self) {
        Stack::drain(self);
    }

    fn size(&self) -> usize {
        Stack::size(self)
    }
}

impl DstTestableStack for TrackedStack<u64> {
    fn push(&self, value: u64) {
        TrackedStack::push(self, value);
    }

    fn pop(&self) -> Option<u64> {
        TrackedStack::pop(self).ok()
    }

    fn peek(&self) -> Option<u64> {
        TrackedStack::peek(self).ok()
    }

    fn pop_if(&self, predicate: &dyn Fn(u64) -> bool) -> Option<u64> {
        TrackedStack::pop_if(self, |top| predicate(*top))
            .ok()
            .flatten()
    }

    fn drain(&self) {
        TrackedStack::drain(self);
    }

    fn size(&self) -> usize {
        TrackedStack::size(self)
    }
}

/// Result of running the harness.
#[derive(Debug, Clone)]
pub struct HarnessResult {
    /// Seed used for reproduction
    pub seed: u64,
    /// Total operations executed
    pub operations_count: u64,
    /// Pops and peeks that found the stack empty (or rejected by the predicate)
    pub empty_results_count: u64,
    /// Invariant checks performed
    pub invariant_checks_count: u64,
    /// Whether all invariants held
    pub all_invariants_held: bool,
    /// First violation (if any)
    pub first_violation: Option<String>,
    /// Failure path for the first violation, when available
    pub counterexample: Option<Counterexample>,
}

impl HarnessResult {
    /// Format for display.
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.all_invariants_held {
            "PASS"
        } else {
            "FAIL"
        };

        let mut result = format!(
            "[{}] DST_SEED={} ops={} empty={} checks={}",
            status,
            self.seed,
            self.operations_count,
            self.empty_results_count,
            self.invariant_checks_count
        );

        if let Some(violation) = &self.first_violation {
            result.push_str(&format!("\n  Violation: {violation}"));
        }
        if let Some(ce) = &self.counterexample {
            result.push('\n');
            result.push_str(&ce.render());
        }

        result
    }
}

#[derive(Debug, Default)]
struct RunStats {
    operations_count: u64,
    empty_results_count: u64,
    invariant_checks_count: u64,
}

/// DST harness for stack testing.
///
/// Given the same seed and config, the harness generates the same
/// operation streams.
pub struct DstHarness {
    rng: DeterministicRng,
    config: HarnessConfig,
}

impl DstHarness {
    /// Create a new harness with the given seed and config.
    #[must_use]
    pub fn new(seed: u64, config: HarnessConfig) -> Self {
        debug_assert!(config.threads_count > 0, "Must have at least one thread");
        debug_assert!(
            config.threads_count <= THREADS_COUNT_MAX,
            "Too many threads for DST: {}",
            config.threads_count
        );
        debug_assert!(config.weights.total() > 0, "Operation weights sum to zero");

        Self {
            rng: DeterministicRng::new(seed),
            config,
        }
    }

    /// Get the seed for reproduction.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// The configuration this harness runs with.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one operation stream, checking invariants as it goes.
    pub fn run_single_threaded<S>(&mut self, stack: &S) -> HarnessResult
    where
        S: DstTestableStack + StackProperties<Element = u64>,
    {
        tracing::debug!(
            seed = self.seed(),
            ops = self.config.operations_per_thread,
            "single-threaded run"
        );

        let checker = StackPropertyChecker::new(stack).with_seed(self.seed());
        let interval = self.config.invariant_check_interval;
        let weights = self.config.weights;
        let mut stats = RunStats::default();
        let mut counter = 0_u64;

        for step in 1..=self.config.operations_per_thread {
            let op = generate_op(&mut self.rng, &weights, 0, &mut counter);
            if !apply(stack, op) {
                stats.empty_results_count += 1;
            }
            stats.operations_count += 1;

            if interval != 0 && step % interval == 0 {
                stats.invariant_checks_count += 1;
                if let Some(violation) = first_violation(&checker) {
                    return self.finish(stats, Some(violation));
                }
            }
        }

        stats.invariant_checks_count += 1;
        let violation = first_violation(&checker);
        self.finish(stats, violation)
    }

    /// Run `threads_count` operation streams on real threads, then check
    /// invariants on the quiescent stack.
    pub fn run_concurrent<S>(&mut self, stack: &S) -> HarnessResult
    where
        S: DstTestableStack + StackProperties<Element = u64>,
    {
        let threads_count = self.config.threads_count;
        let ops = self.config.operations_per_thread;
        let weights = self.config.weights;
        tracing::debug!(seed = self.seed(), threads_count, ops, "concurrent run");

        let rngs: Vec<DeterministicRng> = (0..threads_count).map(|_| self.rng.fork()).collect();

        let outcomes: Vec<thread::Result<u64>> = thread::scope(|s| {
            let handles: Vec<_> = rngs
                .into_iter()
                .enumerate()
                .map(|(index, mut rng)| {
                    s.spawn(move || {
                        let mut counter = 0_u64;
                        let mut empty = 0_u64;
                        for _ in 0..ops {
                            let op = generate_op(&mut rng, &weights, index, &mut counter);
                            if !apply(stack, op) {
                                empty += 1;
                            }
                        }
                        empty
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut stats = RunStats {
            operations_count: ops * threads_count as u64,
            ..RunStats::default()
        };
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(empty) => stats.empty_results_count += empty,
                Err(_) => {
                    let violation =
                        PropertyResult::fail("NoPanics", format!("thread {index} panicked"), None);
                    return self.finish(stats, Some(violation));
                }
            }
        }

        stats.invariant_checks_count += 1;
        let checker = StackPropertyChecker::new(stack).with_seed(self.seed());
        let violation = first_violation(&checker);
        self.finish(stats, violation)
    }

    /// Concurrent pushers each push `operations_per_thread` distinct values,
    /// then as many concurrent poppers pop them all. Every pushed value must
    /// come back exactly once.
    pub fn run_conservation<S: DstTestableStack>(&mut self, stack: &S) -> HarnessResult {
        let threads_count = self.config.threads_count;
        let ops = self.config.operations_per_thread;
        tracing::debug!(seed = self.seed(), threads_count, ops, "conservation run");

        let batches: Vec<Vec<u64>> = (0..threads_count)
            .map(|index| {
                let mut batch: Vec<u64> = (1..=ops).map(|j| encode_value(index, j)).collect();
                self.rng.shuffle(&mut batch);
                batch
            })
            .collect();
        let mut expected: Vec<u64> = batches.iter().flatten().copied().collect();
        expected.sort_unstable();

        thread::scope(|s| {
            for batch in &batches {
                s.spawn(move || {
                    for &value in batch {
                        stack.push(value);
                    }
                });
            }
        });

        let popped: Vec<Option<u64>> = thread::scope(|s| {
            let handles: Vec<_> = (0..threads_count)
                .map(|_| s.spawn(move || (0..ops).map(|_| stack.pop()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_default())
                .collect()
        });

        let mut stats = RunStats {
            operations_count: 2 * ops * threads_count as u64,
            invariant_checks_count: 1,
            ..RunStats::default()
        };
        stats.empty_results_count = popped.iter().filter(|p| p.is_none()).count() as u64;

        let mut actual: Vec<u64> = popped.into_iter().flatten().collect();
        actual.sort_unstable();

        let violation = if actual != expected {
            let lost = expected.len().saturating_sub(actual.len());
            Some(PropertyResult::fail(
                "Conservation",
                format!(
                    "pushed {} values, popped {} ({} missing or duplicated)",
                    expected.len(),
                    actual.len(),
                    lost
                ),
                None,
            ))
        } else if stack.size() != 0 {
            Some(PropertyResult::fail(
                "Conservation",
                format!(
                    "stack still holds {} elements after every value was popped",
                    stack.size()
                ),
                None,
            ))
        } else {
            None
        };

        self.finish(stats, violation)
    }

    fn finish(&self, stats: RunStats, violation: Option<PropertyResult>) -> HarnessResult {
        let (first_violation, counterexample) = match violation {
            Some(result) => {
                tracing::warn!(seed = self.seed(), %result, "invariant violated");
                (Some(result.to_string()), result.counterexample)
            }
            None => (None, None),
        };

        HarnessResult {
            seed: self.seed(),
            operations_count: stats.operations_count,
            empty_results_count: stats.empty_results_count,
            invariant_checks_count: stats.invariant_checks_count,
            all_invariants_held: first_violation.is_none(),
            first_violation,
            counterexample,
        }
    }
}

fn encode_value(thread_index: usize, counter: u64) -> u64 {
    debug_assert!(counter < 1 << VALUE_THREAD_SHIFT, "value counter overflow");
    ((thread_index as u64) << VALUE_THREAD_SHIFT) | counter
}

/// Draw the next operation. Pushed values are unique per `thread_index`.
fn generate_op(
    rng: &mut DeterministicRng,
    weights: &OpWeights,
    thread_index: usize,
    counter: &mut u64,
) -> StackOp {
    let mut roll = rng.gen_range(0..weights.total());

    if roll < weights.push {
        *counter += 1;
        return StackOp::Push(encode_value(thread_index, *counter));
    }
    roll -= weights.push;
    if roll < weights.pop {
        return StackOp::Pop;
    }
    roll -= weights.pop;
    if roll < weights.peek {
        return StackOp::Peek;
    }
    roll -= weights.peek;
    if roll < weights.pop_if {
        return StackOp::PopIfEven;
    }
    StackOp::Drain
}

/// Apply an operation. Returns false if a pop or peek came back empty.
fn apply<S: DstTestableStack + ?Sized>(stack: &S, op: StackOp) -> bool {
    match op {
        StackOp::Push(value) => {
            stack.push(value);
            true
        }
        StackOp::Pop => stack.pop().is_some(),
        StackOp::Peek => stack.peek().is_some(),
        StackOp::PopIfEven => stack.pop_if(&|top| top % 2 == 0).is_some(),
        StackOp::Drain => {
            stack.drain();
            true
        }
    }
}

fn first_violation<C: PropertyChecker>(checker: &C) -> Option<PropertyResult> {
    checker.check_all().into_iter().find(|r| !r.holds)
}
