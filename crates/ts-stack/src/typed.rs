//! Stack restricted to one declared element kind.
//!
//! A [`TypedStack`] owns a [`Stack<Value>`] and a [`Kind`] fixed at
//! construction. Insertion validates the value's kind before the lock is
//! taken, so a rejected push never touches the stack. Everything else
//! delegates to the inner stack unchanged.
//!
//! Code that knows its element type at compile time should use
//! [`Stack<i64>`](crate::IntStack) and friends instead; the typed stack is
//! for values whose kind is only known at runtime (decoded JSON, values
//! handed over as `Any`).

use std::any::Any;
use std::fmt;

use crate::error::{Result, StackError};
use crate::kind::{Kind, Primitive, Value};
use crate::narrow::narrow;
use crate::stack::Stack;

/// A thread-safe stack that only accepts values of its declared kind.
pub struct TypedStack {
    kind: Kind,
    inner: Stack<Value>,
}

impl TypedStack {
    /// Create an empty stack that accepts only `kind` values.
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            inner: Stack::new(),
        }
    }

    /// The declared kind. Fixed for the lifetime of the stack.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    fn check(&self, value: &Value) -> Result<()> {
        let actual = value.kind();
        if actual == self.kind {
            return Ok(());
        }
        tracing::trace!(expected = %self.kind, %actual, "rejected push");
        Err(StackError::TypeMismatch {
            expected: self.kind,
            actual,
        })
    }

    /// Push a value after checking its kind.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::TypeMismatch`] if the value's kind differs from
    /// the declared kind. The stack is unchanged.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check(&value)?;
        self.inner.push(value);
        Ok(())
    }

    /// Push a value whose type is only known at runtime.
    ///
    /// See [`Value::from_any`] for the accepted types.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnsupportedKind`] if the type is not one of the
    /// supported kinds (whatever the declared kind is), otherwise
    /// [`StackError::TypeMismatch`] if the kind differs. The stack is
    /// unchanged on error.
    pub fn push_any<V: Any>(&self, value: V) -> Result<()> {
        self.push_classified(Value::from_any(value))
    }

    /// Push a decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`TypedStack::push_any`], with JSON `null`, arrays, and
    /// objects unsupported.
    pub fn push_json(&self, value: serde_json::Value) -> Result<()> {
        self.push_classified(Value::from_json(value))
    }

    fn push_classified(&self, classified: Result<Value>) -> Result<()> {
        let value = classified.map_err(|err| {
            tracing::trace!(declared = %self.kind, error = %err, "rejected push");
            err
        })?;
        self.check(&value)?;
        self.inner.push(value);
        Ok(())
    }

    /// Remove and return the top value.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn pop(&self) -> Result<Value> {
        self.inner.pop()
    }

    /// Return a copy of the top value without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn peek(&self) -> Result<Value> {
        self.inner.peek()
    }

    /// Apply `f` to the top value without removing or copying it.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn peek_with<R>(&self, f: impl FnOnce(&Value) -> R) -> Result<R> {
        self.inner.peek_with(f)
    }

    /// Pop the top value only if `predicate` accepts it, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn pop_if(&self, predicate: impl FnOnce(&Value) -> bool) -> Result<Option<Value>> {
        self.inner.pop_if(predicate)
    }

    /// Pop the top value only if it equals `expected`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty.
    pub fn pop_if_eq(&self, expected: impl Into<Value>) -> Result<Option<Value>> {
        let expected = expected.into();
        self.inner.pop_if(|top| *top == expected)
    }

    /// Pop and narrow to the concrete type of the declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::EmptyContainer`] if the stack is empty, or
    /// [`StackError::TypeMismatch`] if `T` is not the declared kind (checked
    /// before anything is popped).
    pub fn pop_as<T: Primitive>(&self) -> Result<T> {
        self.expect_kind::<T>()?;
        narrow(self.pop())
    }

    /// Peek and narrow to the concrete type of the declared kind.
    ///
    /// # Errors
    ///
    /// Same as [`TypedStack::pop_as`].
    pub fn peek_as<T: Primitive>(&self) -> Result<T> {
        self.expect_kind::<T>()?;
        narrow(self.peek())
    }

    fn expect_kind<T: Primitive>(&self) -> Result<()> {
        if T::KIND == self.kind {
            Ok(())
        } else {
            Err(StackError::TypeMismatch {
                expected: self.kind,
                actual: T::KIND,
            })
        }
    }

    /// Current number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// True if the stack holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every element. The declared kind is kept.
    pub fn drain(&self) {
        self.inner.drain();
    }
}

impl fmt::Debug for TypedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedStack")
            .field("kind", &self.kind)
            .field("size", &self.size())
            .finish()
    }
}
