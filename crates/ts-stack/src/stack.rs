//! Generic thread-safe stack.
//!
//! [`Stack<T>`] stores its elements in a `Vec` behind a single mutex; the
//! tail of the vector is the top of the stack. Every operation, reads
//! included, holds the lock for its whole duration, so each call is
//! linearizable on its own.
//!
//! Two separate calls are NOT atomic as a pair: a `peek` followed by a
//! `pop` can race with another thread's `pop`. Use [`Stack::pop_if`] (or
//! [`Stack::pop_if_eq`]) when the decision to pop depends on the top.
//!
//! # Invariants
//!
//! | Property | Holds because |
//! |----------|---------------|
//! | LifoOrder | push appends and pop removes the tail under one lock |
//! | NoLostElements / NoDuplicates | each element moves in or out exactly once under the lock |
//! | SizeConsistency | `size()` is `len()` of the guarded `Vec` |

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError};

use crate::error::{Access, Result, StackError};
use crate::sync::{Mutex, MutexGuard};

/// Type-erased element of an [`UntypedStack`].
///
/// Shared ownership means `peek` hands out another handle to the same
/// element rather than a copy of it.
pub type Opaque = Arc<dyn Any + Send + Sync>;

/// A stack that accepts values of any type without validation.
pub type UntypedStack = Stack<Opaque>;

/// Stack specialized to integers at compile time.
pub type IntStack = Stack<i64>;
/// Stack specialized to floats at compile time.
pub type FloatStack = Stack<f64>;
/// Stack specialized to strings at compile time.
pub type StringStack = Stack<String>;
/// Stack specialized to booleans at compile time.
pub type BoolStack = Stack<bool>;

/// A thread-safe LIFO stack.
///
/// Shared between threads through `&Stack<T>` or `Arc<Stack<T>>`; every
/// method takes `&self`.
pub struct Stack<T> {
    elements: Mutex<Vec<T>>,
}

impl<T> Stack<T> {
    /// Create a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Mutex::new(Vec::new()),
        }
    }

    /// Create a new empty stack with room for `capacity` elements before
    /// reallocating. This is not a bound: pushes beyond it still succeed.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Acquire the lock.
    ///
    /// A panic in another thread cannot leave the `Vec` half-modified (no
    /// user code runs while it is mutated), so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a value onto the top of the stack.
    pub fn push(&self, value: T) {
        self.lock().push(value);
    }

    /// Remove and return the top value.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn pop(&self) -> Result<T> {
        self.lock()
            .pop()
            .ok_or(StackError::EmptyContainer(Access::Pop))
    }

    /// Apply `f` to the top value without removing it.
    ///
    /// `f` runs while the lock is held and must not call back into this
    /// stack.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.lock()
            .last()
            .map(f)
            .ok_or(StackError::EmptyContainer(Access::Peek))
    }

    /// Pop the top value only if `predicate` accepts it, as a single atomic
    /// step. Returns `Ok(None)` when the predicate rejects the top.
    ///
    /// `predicate` runs while the lock is held and must not call back into
    /// this stack.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn pop_if(&self, predicate: impl FnOnce(&T) -> bool) -> Result<Option<T>> {
        let mut elements = self.lock();
        let top = elements
            .last()
            .ok_or(StackError::EmptyContainer(Access::Pop))?;
        if predicate(top) {
            Ok(elements.pop())
        } else {
            Ok(None)
        }
    }

    /// Current number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// True if the stack holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every element. Idempotent.
    ///
    /// The removed elements are dropped after the lock is released.
    pub fn drain(&self) {
        let drained = std::mem::take(&mut *self.lock());
        tracing::trace!(count = drained.len(), "drained stack");
    }

    /// Remove every element and hand them back, bottom first.
    pub(crate) fn take_all(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }

    /// Consume the stack and return its elements, bottom first.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.elements
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Stack<T> {
    /// Return a clone of the top value without removing it.
    ///
    /// For an [`UntypedStack`] this clones the `Arc` handle, not the element.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn peek(&self) -> Result<T> {
        self.peek_with(T::clone)
    }

    /// Copy of the current contents, bottom first.
    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.lock().clone()
    }
}

impl<T: PartialEq> Stack<T> {
    /// Pop the top value only if it equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn pop_if_eq(&self, expected: &T) -> Result<Option<T>> {
        self.pop_if(|top| top == expected)
    }
}

impl UntypedStack {
    /// Push any value, erasing its type.
    pub fn push_value<V: Any + Send + Sync>(&self, value: V) {
        self.push(Arc::new(value));
    }
}

/// Narrow an element popped or peeked from an [`UntypedStack`].
///
/// An incoming error is passed through untouched.
///
/// # Errors
///
/// Returns the incoming error unchanged.
///
/// # Panics
///
/// Panics if the element is not a `V`. Callers of an untyped stack know
/// what they stored; a mismatch is a bug, not an input error.
pub fn downcast<V: Any + Send + Sync>(result: Result<Opaque>) -> Result<Arc<V>> {
    result.map(|opaque| match opaque.downcast::<V>() {
        Ok(value) => value,
        Err(_) => panic!(
            "untyped stack element is not a `{}`",
            std::any::type_name::<V>()
        ),
    })
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack").field("size", &self.size()).finish()
    }
}

impl<T> FromIterator<T> for Stack<T> {
    /// Build a stack by pushing each item in order; the last item ends up on top.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: Mutex::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_basic_push_pop() {
        let stack = Stack::new();

        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.pop(), Ok(1));
        assert_eq!(stack.pop(), Err(StackError::EmptyContainer(Access::Pop)));
    }

    #[test]
    fn test_with_capacity_is_not_a_bound() {
        let stack = Stack::with_capacity(2);
        assert!(stack.is_empty());

        for i in 0..5 {
            stack.push(i);
        }
        assert_eq!(stack.size(), 5);
        assert_eq!(stack.pop(), Ok(4));
    }

    #[test]
    fn test_lifo_order() {
        let stack = Stack::new();

        for i in 1..=10 {
            stack.push(i);
        }

        for i in (1..=10).rev() {
            assert_eq!(stack.pop(), Ok(i), "LIFO order violated");
        }
    }

    #[test]
    fn test_peek_does_not_change_size() {
        let stack = Stack::new();
        assert_eq!(stack.peek(), Err(StackError::EmptyContainer(Access::Peek)));

        stack.push(5);
        stack.push(6);
        assert_eq!(stack.peek(), Ok(6));
        assert_eq!(stack.peek(), Ok(6));
        assert_eq!(stack.size(), 2);
        assert_eq!(stack.peek_with(|v| v * 10), Ok(60));
    }

    #[test]
    fn test_size_after_pushes_and_pops() {
        let stack = IntStack::new();
        for i in 0..7 {
            stack.push(i);
        }
        for _ in 0..3 {
            stack.pop().unwrap();
        }
        assert_eq!(stack.size(), 4);
        assert!(!stack.is_empty());
    }

    #[test]
    fn test_drain() {
        let stack = Stack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);

        stack.drain();
        assert_eq!(stack.size(), 0);
        assert!(stack.is_empty());
        assert!(stack.pop().unwrap_err().is_empty_container());
        assert!(stack.peek().unwrap_err().is_empty_container());

        // Idempotent, and the stack stays usable.
        stack.drain();
        stack.push(4);
        assert_eq!(stack.peek(), Ok(4));
    }

    #[test]
    fn test_pop_if() {
        let stack: StringStack = ["a", "b"].into_iter().map(String::from).collect();

        assert_eq!(stack.pop_if(|top| top == "a"), Ok(None));
        assert_eq!(stack.size(), 2);
        assert_eq!(stack.pop_if_eq(&"b".to_string()), Ok(Some("b".to_string())));
        assert_eq!(stack.pop_if(|_| true), Ok(Some("a".to_string())));
        assert_eq!(
            stack.pop_if(|_| true),
            Err(StackError::EmptyContainer(Access::Pop))
        );
    }

    #[test]
    fn test_untyped_holds_any_value() {
        #[derive(Debug, PartialEq)]
        struct Foo {
            bar: String,
            baz: bool,
        }

        let stack = UntypedStack::new();
        stack.push_value(7_u8);
        stack.push_value(Foo {
            bar: "Hello, World!".to_string(),
            baz: true,
        });

        let top = downcast::<Foo>(stack.peek()).unwrap();
        assert_eq!(top.bar, "Hello, World!");
        assert!(top.baz);

        // peek shares the element rather than copying it.
        let again = stack.peek().unwrap();
        assert_eq!(Arc::strong_count(&again), 3);

        drop((top, again));
        assert!(downcast::<Foo>(stack.pop()).is_ok());
        assert_eq!(*downcast::<u8>(stack.pop()).unwrap(), 7);
        let err = downcast::<u8>(stack.pop()).unwrap_err();
        assert!(err.is_empty_container());
    }

    #[test]
    #[should_panic(expected = "is not a")]
    fn test_downcast_wrong_type_panics() {
        let stack = UntypedStack::new();
        stack.push_value("text");
        let _ = downcast::<i64>(stack.pop());
    }

    #[test]
    fn test_into_vec_and_debug() {
        let stack: Stack<i32> = (1..=3).collect();
        assert_eq!(format!("{stack:?}"), "Stack { size: 3 }");
        assert_eq!(stack.into_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_concurrent_push_then_pop() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 500;

        let stack = Stack::new();

        thread::scope(|s| {
            for t in 0..THREADS {
                let stack = &stack;
                s.spawn(move || {
                    for j in 0..PER_THREAD {
                        stack.push(t * PER_THREAD + j);
                    }
                });
            }
        });
        assert_eq!(stack.size() as u64, THREADS * PER_THREAD);

        let popped: Vec<Vec<u64>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let stack = &stack;
                    s.spawn(move || {
                        (0..PER_THREAD)
                            .map(|_| stack.pop().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let all: Vec<u64> = popped.into_iter().flatten().collect();
        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(all.len() as u64, THREADS * PER_THREAD, "lost elements");
        assert_eq!(unique.len(), all.len(), "duplicate elements");
        assert!(stack.is_empty());
    }
}

/// Loom tests - these exhaustively check all interleavings
#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn test_push_push() {
        loom::model(|| {
            let stack = Arc::new(Stack::new());

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);

            let h1 = thread::spawn(move || s1.push(1));
            let h2 = thread::spawn(move || s2.push(2));

            h1.join().unwrap();
            h2.join().unwrap();

            let mut values = vec![];
            while let Ok(v) = stack.pop() {
                values.push(v);
            }
            values.sort_unstable();
            assert_eq!(values, vec![1, 2]);
        });
    }

    #[test]
    fn test_concurrent_pop() {
        loom::model(|| {
            let stack = Arc::new(Stack::new());
            stack.push(1);

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);

            let h1 = thread::spawn(move || s1.pop().ok());
            let h2 = thread::spawn(move || s2.pop().ok());

            // Exactly one should get the value
            match (h1.join().unwrap(), h2.join().unwrap()) {
                (Some(1), None) | (None, Some(1)) => {}
                other => panic!("Unexpected result: {:?}", other),
            }
        });
    }

    #[test]
    fn test_pop_if_is_atomic() {
        loom::model(|| {
            let stack = Arc::new(Stack::new());
            stack.push(1);

            let s1 = Arc::clone(&stack);
            let s2 = Arc::clone(&stack);

            let h1 = thread::spawn(move || s1.pop_if_eq(&1));
            let h2 = thread::spawn(move || s2.pop());

            let conditional = h1.join().unwrap();
            let plain = h2.join().unwrap();

            // The conditional pop either wins the element or sees an empty
            // stack; it never observes 1 and then loses it.
            match (conditional, plain) {
                (Ok(Some(1)), Err(_)) | (Err(_), Ok(1)) => {}
                other => panic!("Unexpected result: {:?}", other),
            }
        });
    }
}
