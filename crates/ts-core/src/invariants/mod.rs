//! Invariant traits for concurrent containers.
//!
//! - `stack`: LIFO stack invariants (NoLostElements, NoDuplicates,
//!   LifoOrder, SizeConsistency)

pub mod stack;
