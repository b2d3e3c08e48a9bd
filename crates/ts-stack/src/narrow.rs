//! Narrowing wrappers for values popped or peeked from a typed stack.
//!
//! Each wrapper takes the result of [`TypedStack::pop`] or
//! [`TypedStack::peek`] directly:
//!
//! ```
//! use ts_stack::{as_int, Kind, TypedStack};
//!
//! let s = TypedStack::new(Kind::Integer);
//! s.push(1).unwrap();
//! assert_eq!(as_int(s.peek()), Ok(1));
//! ```
//!
//! An incoming error passes through untouched. A value of the wrong kind is
//! a caller bug (the stack only holds its declared kind) and panics.
//!
//! [`TypedStack::pop`]: crate::TypedStack::pop
//! [`TypedStack::peek`]: crate::TypedStack::peek

use crate::error::Result;
use crate::kind::{Primitive, Value};

/// Narrow a popped or peeked value to `T`.
///
/// # Errors
///
/// Returns the incoming error unchanged.
///
/// # Panics
///
/// Panics if the value is not of `T`'s kind.
pub fn narrow<T: Primitive>(result: Result<Value>) -> Result<T> {
    let value = result?;
    let actual = value.kind();
    match T::from_value(value) {
        Some(v) => Ok(v),
        None => panic!(
            "cannot narrow a {actual} value to {}: wrapper does not match the stack's kind",
            T::KIND
        ),
    }
}

/// Narrow to `i64`. See [`narrow`].
///
/// # Errors
///
/// Returns the incoming error unchanged.
pub fn as_int(result: Result<Value>) -> Result<i64> {
    narrow(result)
}

/// Narrow to `f64`. See [`narrow`].
///
/// # Errors
///
/// Returns the incoming error unchanged.
pub fn as_float(result: Result<Value>) -> Result<f64> {
    narrow(result)
}

/// Narrow to `String`. See [`narrow`].
///
/// # Errors
///
/// Returns the incoming error unchanged.
pub fn as_string(result: Result<Value>) -> Result<String> {
    narrow(result)
}

/// Narrow to `bool`. See [`narrow`].
///
/// # Errors
///
/// Returns the incoming error unchanged.
pub fn as_bool(result: Result<Value>) -> Result<bool> {
    narrow(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Access, StackError};

    #[test]
    fn test_error_passes_through() {
        let err = StackError::EmptyContainer(Access::Pop);
        assert_eq!(as_string(Err(err.clone())), Err(err.clone()));
        assert_eq!(as_float(Err(err.clone())), Err(err));
    }

    #[test]
    fn test_matching_kind() {
        assert_eq!(
            as_string(Ok(Value::String("Hello".into()))),
            Ok("Hello".to_string())
        );
        assert_eq!(narrow::<bool>(Ok(Value::Boolean(false))), Ok(false));
    }

    #[test]
    #[should_panic(expected = "cannot narrow a string value to integer")]
    fn test_mismatched_wrapper_panics() {
        let _ = as_int(Ok(Value::String("x".into())));
    }
}
