//! Error types for stack operations.

use std::fmt;

use crate::kind::Kind;

/// Result alias used by every fallible stack operation.
pub type Result<T> = std::result::Result<T, StackError>;

/// Errors returned by stack operations.
///
/// Every variant is recoverable: the stack is left exactly as it was
/// before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// `pop` or `peek` found the stack empty.
    #[error("{0} from empty stack")]
    EmptyContainer(Access),

    /// A typed stack was handed a value of another supported kind.
    #[error("type mismatch: stack holds {expected} values, got {actual}")]
    TypeMismatch { expected: Kind, actual: Kind },

    /// A typed stack was handed a value outside the supported kinds.
    #[error("unsupported kind `{type_name}`: only integer, float, string and boolean values can be stored")]
    UnsupportedKind { type_name: String },
}

impl StackError {
    /// True for [`StackError::EmptyContainer`], whichever access raised it.
    #[must_use]
    pub fn is_empty_container(&self) -> bool {
        matches!(self, Self::EmptyContainer(_))
    }
}

/// The read that hit an empty stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Pop,
    Peek,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pop => f.write_str("pop"),
            Self::Peek => f.write_str("peek"),
        }
    }
}

/// Error returned when a kind name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind `{0}`: expected one of integer, float, string, boolean")]
pub struct ParseKindError(pub String);
