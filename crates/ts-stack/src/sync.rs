//! Lock primitives, swapped for loom's under `--cfg loom` so the model
//! checker can explore every interleaving of the stack's critical sections.

#[cfg(loom)]
pub(crate) use loom::sync::{Mutex, MutexGuard};

#[cfg(not(loom))]
pub(crate) use std::sync::{Mutex, MutexGuard};
