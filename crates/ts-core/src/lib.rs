//! # ts-core
//!
//! Invariant checking for the thread-safe stack.
//!
//! This crate provides:
//! - `PropertyResult` and `PropertyChecker` for verifying invariants
//! - `Counterexample` for rendering the operations that led to a failure
//! - `StackProperties`, the view a stack exposes so its invariants can be
//!   checked, and `StackPropertyChecker`, which checks them
//!
//! Nothing here depends on how a stack is stored or locked. Anything that
//! can report what was pushed, what left, and what it currently holds can
//! be checked.

pub mod counterexample;
pub mod invariants;
pub mod property;

pub use counterexample::{Counterexample, StateSnapshot, ThreadAction};
pub use invariants::stack::{
    StackHistory, StackOpType, StackOperation, StackProperties, StackPropertyChecker,
};
pub use property::{PropertyChecker, PropertyResult};
