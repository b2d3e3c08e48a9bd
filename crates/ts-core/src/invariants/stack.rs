//! Stack invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | NoLostElements | Every pushed element is in the stack, was popped, or was drained |
//! | NoDuplicates | No element leaves or remains more often than it was pushed |
//! | LifoOrder | Replaying the history on a model stack reproduces every result |
//! | SizeConsistency | `size()` agrees with the contents and with the operation counts |
//!
//! Elements are compared as multisets, so a stack may hold the same value
//! more than once without tripping `NoDuplicates`.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::counterexample::{Counterexample, StateSnapshot, ThreadAction};
use crate::property::{PropertyChecker, PropertyResult};

/// Number of trailing operations attached to a LIFO counterexample.
const COUNTEREXAMPLE_OPERATIONS_MAX: usize = 16;

/// Properties that any stack implementation must expose for checking.
///
/// Implementations report what went in, what came out, and what is
/// currently held. The checker verifies invariants against this state,
/// so it must be read while the stack is quiescent.
pub trait StackProperties {
    /// Element type held by the stack.
    type Element: Clone + Eq + Hash + fmt::Debug;

    /// Every element successfully pushed, in push order.
    fn pushed_elements(&self) -> Vec<Self::Element>;

    /// Every element returned by a successful pop.
    fn popped_elements(&self) -> Vec<Self::Element>;

    /// Every element discarded by a drain.
    fn drained_elements(&self) -> Vec<Self::Element> {
        Vec::new()
    }

    /// Current contents of the stack, bottom first (the last element is the top).
    fn current_contents(&self) -> Vec<Self::Element>;

    /// The size the stack itself reports.
    fn current_size(&self) -> usize;

    /// Operation history for LIFO order checking.
    /// Returns owned data to avoid holding internal locks across the check.
    fn history(&self) -> StackHistory<Self::Element>;
}

/// History of stack operations in linearization order.
#[derive(Debug, Clone)]
pub struct StackHistory<T> {
    /// Sequence of operations in the order the stack applied them
    pub operations: Vec<StackOperation<T>>,
}

/// A single stack operation.
#[derive(Debug, Clone)]
pub struct StackOperation<T> {
    /// Thread that performed the operation
    pub thread_id: u64,
    /// Type of operation
    pub op_type: StackOpType,
    /// Element pushed, or the element a pop/peek returned
    pub element: Option<T>,
    /// Step number for ordering
    pub step: u64,
}

/// Type of stack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOpType {
    Push,
    Pop,
    PopEmpty,
    Peek,
    PeekEmpty,
    Drain,
}

impl<T> Default for StackHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StackHistory<T> {
    /// Create a new empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Record a push operation.
    pub fn record_push(&mut self, thread_id: u64, element: T, step: u64) {
        self.record(thread_id, StackOpType::Push, Some(element), step);
    }

    /// Record a pop operation. `None` means the pop found the stack empty.
    pub fn record_pop(&mut self, thread_id: u64, element: Option<T>, step: u64) {
        let op_type = if element.is_some() {
            StackOpType::Pop
        } else {
            StackOpType::PopEmpty
        };
        self.record(thread_id, op_type, element, step);
    }

    /// Record a peek operation. `None` means the peek found the stack empty.
    pub fn record_peek(&mut self, thread_id: u64, element: Option<T>, step: u64) {
        let op_type = if element.is_some() {
            StackOpType::Peek
        } else {
            StackOpType::PeekEmpty
        };
        self.record(thread_id, op_type, element, step);
    }

    /// Record a drain.
    pub fn record_drain(&mut self, thread_id: u64, step: u64) {
        self.record(thread_id, StackOpType::Drain, None, step);
    }

    fn record(&mut self, thread_id: u64, op_type: StackOpType, element: Option<T>, step: u64) {
        debug_assert!(step > 0, "Step must be positive");
        debug_assert!(
            self.operations.last().map_or(true, |last| step > last.step),
            "Steps must be strictly increasing"
        );
        self.operations.push(StackOperation {
            thread_id,
            op_type,
            element,
            step,
        });
    }
}

impl<T: fmt::Debug> StackOperation<T> {
    fn to_action(&self) -> ThreadAction {
        let (action, success) = match (self.op_type, &self.element) {
            (StackOpType::Push, Some(e)) => (format!("push({e:?})"), true),
            (StackOpType::Pop, Some(e)) => (format!("pop() -> {e:?}"), true),
            (StackOpType::Peek, Some(e)) => (format!("peek() -> {e:?}"), true),
            (StackOpType::PopEmpty, _) => ("pop() -> empty".to_string(), false),
            (StackOpType::PeekEmpty, _) => ("peek() -> empty".to_string(), false),
            (StackOpType::Drain, _) => ("drain()".to_string(), true),
            (op, None) => (format!("{op:?}"), false),
        };
        ThreadAction {
            thread_id: self.thread_id,
            step: self.step,
            action,
            success,
        }
    }
}

/// Property checker for stack implementations.
pub struct StackPropertyChecker<'a, S: StackProperties> {
    stack: &'a S,
    dst_seed: Option<u64>,
}

impl<'a, S: StackProperties> StackPropertyChecker<'a, S> {
    /// Create a new checker for the given stack.
    #[must_use]
    pub fn new(stack: &'a S) -> Self {
        Self {
            stack,
            dst_seed: None,
        }
    }

    /// Set DST seed for counterexample reproduction.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.dst_seed = Some(seed);
        self
    }

    fn counterexample(&self) -> Counterexample {
        match self.dst_seed {
            Some(seed) => Counterexample::with_seed(seed),
            None => Counterexample::new(),
        }
    }

    /// Every pushed occurrence must be in the stack, popped, or drained.
    fn check_no_lost_elements(&self) -> PropertyResult {
        let pushed = multiset(self.stack.pushed_elements());
        let accounted = self.accounted();

        for (element, pushed_count) in &pushed {
            let found = accounted.get(element).copied().unwrap_or(0);
            if found < *pushed_count {
                let mut ce = self
                    .counterexample()
                    .with_description(format!("element {element:?} lost"));
                ce.add_state(StateSnapshot {
                    step: 1,
                    description: format!("element {element:?} lost"),
                    variables: vec![
                        ("pushed".to_string(), pushed_count.to_string()),
                        ("accounted".to_string(), found.to_string()),
                        (
                            "contents".to_string(),
                            format!("{:?}", self.stack.current_contents()),
                        ),
                    ],
                });

                return PropertyResult::fail(
                    "NoLostElements",
                    format!(
                        "element {element:?} pushed {pushed_count} time(s) but only {found} accounted for"
                    ),
                    Some(ce),
                );
            }
        }

        PropertyResult::pass("NoLostElements")
    }

    /// Nothing may be held, popped, or drained more often than it was pushed.
    fn check_no_duplicates(&self) -> PropertyResult {
        let pushed = multiset(self.stack.pushed_elements());

        for (element, found) in self.accounted() {
            let pushed_count = pushed.get(&element).copied().unwrap_or(0);
            if found > pushed_count {
                return PropertyResult::fail(
                    "NoDuplicates",
                    format!(
                        "element {element:?} seen {found} time(s) but pushed {pushed_count} time(s)"
                    ),
                    None,
                );
            }
        }

        PropertyResult::pass("NoDuplicates")
    }

    /// Replays the history against a model `Vec` and checks every result.
    fn check_lifo_order(&self) -> PropertyResult {
        let history = self.stack.history();

        if history.is_empty() {
            return PropertyResult::pass("LifoOrder");
        }

        let mut model: Vec<S::Element> = Vec::new();

        for (index, op) in history.operations.iter().enumerate() {
            let violation = match (op.op_type, &op.element) {
                (StackOpType::Push, Some(e)) => {
                    model.push(e.clone());
                    None
                }
                (StackOpType::Pop, Some(got)) => match model.pop() {
                    Some(expected) if expected != *got => Some(format!(
                        "pop returned {got:?} but model expected {expected:?} (step {})",
                        op.step
                    )),
                    None => Some(format!(
                        "pop returned {got:?} but model stack was empty (step {})",
                        op.step
                    )),
                    Some(_) => None,
                },
                (StackOpType::Peek, Some(got)) => match model.last() {
                    Some(expected) if expected != got => Some(format!(
                        "peek returned {got:?} but model top is {expected:?} (step {})",
                        op.step
                    )),
                    None => Some(format!(
                        "peek returned {got:?} but model stack was empty (step {})",
                        op.step
                    )),
                    Some(_) => None,
                },
                (StackOpType::PopEmpty | StackOpType::PeekEmpty, _) if !model.is_empty() => {
                    Some(format!(
                        "{:?} reported empty but model has {} elements (step {})",
                        op.op_type,
                        model.len(),
                        op.step
                    ))
                }
                (StackOpType::Drain, _) => {
                    model.clear();
                    None
                }
                _ => None,
            };

            if let Some(violation) = violation {
                let mut ce = self.counterexample().with_description(violation.clone());
                let start = (index + 1).saturating_sub(COUNTEREXAMPLE_OPERATIONS_MAX);
                for recorded in &history.operations[start..=index] {
                    ce.add_action(recorded.to_action());
                }
                return PropertyResult::fail("LifoOrder", violation, Some(ce));
            }
        }

        let contents = self.stack.current_contents();
        if model != contents {
            return PropertyResult::fail(
                "LifoOrder",
                format!("history replays to {model:?} but stack holds {contents:?}"),
                None,
            );
        }

        PropertyResult::pass("LifoOrder")
    }

    /// `size()` must match the contents and `pushes - pops - drained`.
    fn check_size_consistency(&self) -> PropertyResult {
        let size = self.stack.current_size();
        let contents_len = self.stack.current_contents().len();
        let pushed = self.stack.pushed_elements().len();
        let removed = self.stack.popped_elements().len() + self.stack.drained_elements().len();

        if size != contents_len {
            return PropertyResult::fail(
                "SizeConsistency",
                format!("size() is {size} but stack holds {contents_len} elements"),
                None,
            );
        }
        if pushed.checked_sub(removed) != Some(size) {
            return PropertyResult::fail(
                "SizeConsistency",
                format!("size() is {size} after {pushed} pushes and {removed} removals"),
                None,
            );
        }

        PropertyResult::pass("SizeConsistency")
    }

    fn accounted(&self) -> HashMap<S::Element, usize> {
        let mut accounted = multiset(self.stack.current_contents());
        for element in self
            .stack
            .popped_elements()
            .into_iter()
            .chain(self.stack.drained_elements())
        {
            *accounted.entry(element).or_insert(0) += 1;
        }
        accounted
    }
}

impl<S: StackProperties> PropertyChecker for StackPropertyChecker<'_, S> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_no_lost_elements(),
            self.check_no_duplicates(),
            self.check_lifo_order(),
            self.check_size_consistency(),
        ]
    }
}

fn multiset<T: Eq + Hash>(elements: Vec<T>) -> HashMap<T, usize> {
    let mut counts = HashMap::new();
    for element in elements {
        *counts.entry(element).or_insert(0) += 1;
    }
    counts
}
