//! Stack wrapper that records every operation for invariant checking.
//!
//! Each operation runs on the inner [`Stack`] while the tracker lock is
//! held, so the recorded history is exactly the order in which the stack
//! applied the operations. That serializes callers more than the plain
//! stack does; use it in tests and simulations, not on hot paths.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::PoisonError;

use ts_core::{StackHistory, StackProperties};

use crate::error::Result;
use crate::stack::Stack;
use crate::sync::{Mutex, MutexGuard};

/// Tracking state for property verification.
struct Tracker<T> {
    pushed: Vec<T>,
    popped: Vec<T>,
    drained: Vec<T>,
    history: StackHistory<T>,
    step: u64,
}

impl<T> Tracker<T> {
    fn next_step(&mut self) -> u64 {
        self.step += 1;
        self.step
    }
}

/// A [`Stack`] that records its history and implements [`StackProperties`].
pub struct TrackedStack<T> {
    stack: Stack<T>,
    tracker: Mutex<Tracker<T>>,
}

/// Small sequential id for the calling thread, used in recorded histories.
fn current_thread_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);
    std::thread_local! {
        static THREAD_ID: u64 = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    }
    THREAD_ID.with(|id| *id)
}

impl<T> TrackedStack<T> {
    /// Create a new empty tracked stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Stack::new(),
            tracker: Mutex::new(Tracker {
                pushed: Vec::new(),
                popped: Vec::new(),
                drained: Vec::new(),
                history: StackHistory::new(),
                step: 0,
            }),
        }
    }

    fn tracker(&self) -> MutexGuard<'_, Tracker<T>> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.stack.size()
    }

    /// True if the stack holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Number of operations recorded so far.
    #[must_use]
    pub fn operations_count(&self) -> u64 {
        self.tracker().step
    }
}

impl<T: Clone> TrackedStack<T> {
    /// Push a value and record it.
    pub fn push(&self, value: T) {
        let mut tracker = self.tracker();
        self.stack.push(value.clone());
        let step = tracker.next_step();
        tracker.pushed.push(value.clone());
        tracker
            .history
            .record_push(current_thread_id(), value, step);
    }

    /// Pop the top value and record the result.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`](crate::StackError::EmptyContainer)
    /// if the stack is empty.
    pub fn pop(&self) -> Result<T> {
        let mut tracker = self.tracker();
        let result = self.stack.pop();
        let step = tracker.next_step();
        if let Ok(value) = &result {
            tracker.popped.push(value.clone());
        }
        tracker
            .history
            .record_pop(current_thread_id(), result.as_ref().ok().cloned(), step);
        result
    }

    /// Peek at the top value and record the result.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`](crate::StackError::EmptyContainer)
    /// if the stack is empty.
    pub fn peek(&self) -> Result<T> {
        let mut tracker = self.tracker();
        let result = self.stack.peek();
        let step = tracker.next_step();
        tracker
            .history
            .record_peek(current_thread_id(), result.as_ref().ok().cloned(), step);
        result
    }

    /// Conditionally pop the top value, recording a pop only if it happened.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`](crate::StackError::EmptyContainer)
    /// if the stack is empty.
    pub fn pop_if(&self, predicate: impl FnOnce(&T) -> bool) -> Result<Option<T>> {
        let mut tracker = self.tracker();
        let result = self.stack.pop_if(predicate);
        match &result {
            Ok(Some(value)) => {
                let step = tracker.next_step();
                tracker.popped.push(value.clone());
                tracker
                    .history
                    .record_pop(current_thread_id(), Some(value.clone()), step);
            }
            Ok(None) => {}
            Err(_) => {
                let step = tracker.next_step();
                tracker.history.record_pop(current_thread_id(), None, step);
            }
        }
        result
    }

    /// Remove every element, recording what was discarded.
    pub fn drain(&self) {
        let mut tracker = self.tracker();
        let drained = self.stack.take_all();
        let step = tracker.next_step();
        tracker.drained.extend(drained);
        tracker.history.record_drain(current_thread_id(), step);
    }
}

impl<T> Default for TrackedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TrackedStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedStack")
            .field("size", &self.size())
            .field("operations", &self.operations_count())
            .finish()
    }
}

impl<T: Clone + Eq + Hash + fmt::Debug> TrackedStack<T> {
    /// Elements pushed but neither popped, drained, nor still held,
    /// counted as a multiset. Empty for a correct stack.
    #[must_use]
    pub fn unaccounted(&self) -> Vec<T> {
        let tracker = self.tracker();
        let mut counts: HashMap<&T, isize> = HashMap::new();
        for element in &tracker.pushed {
            *counts.entry(element).or_insert(0) += 1;
        }
        let contents = self.stack.snapshot();
        let removed = tracker.popped.iter().chain(&tracker.drained);
        for element in removed.chain(&contents) {
            *counts.entry(element).or_insert(0) -= 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .flat_map(|(element, n)| std::iter::repeat(element.clone()).take(n.unsigned_abs()))
            .collect()
    }
}

impl<T: Clone + Eq + Hash + fmt::Debug> StackProperties for TrackedStack<T> {
    type Element = T;

    fn pushed_elements(&self) -> Vec<T> {
        self.tracker().pushed.clone()
    }

    fn popped_elements(&self) -> Vec<T> {
        self.tracker().popped.clone()
    }

    fn drained_elements(&self) -> Vec<T> {
        self.tracker().drained.clone()
    }

    fn current_contents(&self) -> Vec<T> {
        self.stack.snapshot()
    }

    fn current_size(&self) -> usize {
        self.stack.size()
    }

    fn history(&self) -> StackHistory<T> {
        self.tracker().history.clone()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use ts_core::{PropertyChecker, StackPropertyChecker};

    #[test]
    fn test_invariants_basic() {
        let stack = TrackedStack::new();

        stack.push(1_u64);
        stack.push(2);
        assert_eq!(stack.peek(), Ok(2));
        assert_eq!(stack.pop(), Ok(2));
        stack.drain();
        assert!(stack.pop().is_err());
        stack.push(3);

        let checker = StackPropertyChecker::new(&stack);
        assert!(checker.all_hold(), "{:?}", checker.violations());
        assert_eq!(stack.operations_count(), 7);
        assert!(stack.unaccounted().is_empty());
    }

    #[test]
    fn test_pop_if_records_only_real_pops() {
        let stack = TrackedStack::new();
        stack.push("a");
        assert_eq!(stack.pop_if(|top| *top == "b"), Ok(None));
        assert_eq!(stack.pop_if(|top| *top == "a"), Ok(Some("a")));
        assert!(stack.pop_if(|_| true).is_err());

        assert_eq!(stack.history().len(), 3);
        assert!(StackPropertyChecker::new(&stack).all_hold());
    }

    #[test]
    fn test_concurrent_history_is_linearizable() {
        let stack = Arc::new(TrackedStack::new());
        let mut handles = vec![];

        for t in 0..4_u64 {
            let stack = Arc::clone(&stack);
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    stack.push(t * 1000 + j);
                    if j % 3 == 0 {
                        let _ = stack.pop();
                    }
                    if j % 50 == 0 {
                        let _ = stack.peek();
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let checker = StackPropertyChecker::new(stack.as_ref());
        assert!(checker.all_hold(), "{:?}", checker.violations());

        let history = stack.history();
        let threads: std::collections::HashSet<u64> =
            history.operations.iter().map(|op| op.thread_id).collect();
        assert_eq!(threads.len(), 4);
    }
}
