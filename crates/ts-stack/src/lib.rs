//! # ts-stack
//!
//! A thread-safe LIFO stack.
//!
//! - [`Stack<T>`]: generic stack, one mutex around a `Vec`. [`UntypedStack`]
//!   is `Stack` over type-erased values and accepts anything.
//! - [`TypedStack`]: a stack declared with a [`Kind`] at construction that
//!   rejects values of any other kind at insertion time.
//! - [`as_int`], [`as_float`], [`as_string`], [`as_bool`]: narrow the result
//!   of a typed `pop`/`peek` to a concrete type.
//! - [`TrackedStack`]: records its history and implements
//!   [`ts_core::StackProperties`] for invariant checking.
//!
//! Every error is returned to the caller as a [`StackError`]; the library
//! never logs above `trace` level and never installs a subscriber.
//!
//! ```
//! use ts_stack::{as_int, Kind, StackError, TypedStack};
//!
//! let s = TypedStack::new(Kind::Integer);
//! s.push(1).unwrap();
//! assert_eq!(as_int(s.peek()), Ok(1));
//! assert!(matches!(s.push("x"), Err(StackError::TypeMismatch { .. })));
//! ```
//!
//! For loom tests:
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test -p ts-stack --release
//! ```

pub mod error;
pub mod kind;
pub mod narrow;
pub mod stack;
mod sync;
pub mod tracked;
pub mod typed;

pub use error::{Access, ParseKindError, Result, StackError};
pub use kind::{Kind, Primitive, Value};
pub use narrow::{as_bool, as_float, as_int, as_string, narrow};
pub use stack::{
    downcast, BoolStack, FloatStack, IntStack, Opaque, Stack, StringStack, UntypedStack,
};
pub use tracked::TrackedStack;
pub use typed::TypedStack;
