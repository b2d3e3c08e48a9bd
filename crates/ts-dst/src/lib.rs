//! # ts-dst
//!
//! Deterministic Simulation Testing for the thread-safe stack.
//!
//! Operation streams are generated from a seed, so a failing run can be
//! replayed exactly. Invariants come from `ts-core`.
//!
//! ## Usage
//!
//! ```rust
//! use ts_dst::{DstHarness, HarnessConfig};
//! use ts_stack::TrackedStack;
//!
//! let stack: TrackedStack<u64> = TrackedStack::new();
//! let mut harness = DstHarness::new(12345, HarnessConfig::quick());
//! let result = harness.run_single_threaded(&stack);
//! assert!(result.all_invariants_held, "{}", result.format());
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing test:
//! ```bash
//! DST_SEED=12345 cargo test -p ts-dst
//! ```

pub mod harness;
pub mod random;

pub use harness::{
    DstHarness, DstTestableStack, HarnessConfig, HarnessResult, OpWeights, StackOp,
};
pub use random::DeterministicRng;

/// Environment variable holding the seed to replay.
pub const SEED_ENV: &str = "DST_SEED";

/// Environment variable overriding the number of iterations.
pub const ITERATIONS_ENV: &str = "DST_ITERATIONS";

/// Errors reading DST configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    #[error("{name} must be a valid u64, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
}

fn u64_from_env(name: &'static str) -> Result<Option<u64>, EnvError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EnvError::InvalidNumber { name, value }),
        Err(_) => Ok(None),
    }
}

/// Get DST seed from `DST_SEED` or generate a random one.
///
/// The seed is printed so a failing run can be reproduced with
/// `DST_SEED=<seed>`.
///
/// # Errors
///
/// Returns [`EnvError::InvalidNumber`] if `DST_SEED` is set but not a `u64`.
pub fn get_or_generate_seed() -> Result<u64, EnvError> {
    let (seed, source) = match u64_from_env(SEED_ENV)? {
        Some(seed) => (seed, "environment"),
        None => (rand::random::<u64>(), "randomly generated"),
    };
    println!("{SEED_ENV}={seed} ({source})");
    tracing::info!(seed, source, "DST seed");
    Ok(seed)
}

/// Number of iterations from `DST_ITERATIONS`, or `default`.
///
/// # Errors
///
/// Returns [`EnvError::InvalidNumber`] if `DST_ITERATIONS` is set but not a `u64`.
pub fn iterations_from_env(default: u64) -> Result<u64, EnvError> {
    Ok(u64_from_env(ITERATIONS_ENV)?.unwrap_or(default))
}
