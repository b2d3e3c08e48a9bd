//! Property results and the checker trait.

use std::fmt;

use crate::counterexample::Counterexample;

/// Outcome of checking a single named invariant.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Invariant name (e.g. `"LifoOrder"`)
    pub name: &'static str,
    /// Whether the invariant held
    pub holds: bool,
    /// What went wrong, if it did not hold
    pub violation: Option<String>,
    /// Failure path, when the checker could build one
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    /// A passing result.
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        Self {
            name,
            holds: true,
            violation: None,
            counterexample: None,
        }
    }

    /// A failing result.
    #[must_use]
    pub fn fail(
        name: &'static str,
        violation: impl Into<String>,
        counterexample: Option<Counterexample>,
    ) -> Self {
        Self {
            name,
            holds: false,
            violation: Some(violation.into()),
            counterexample,
        }
    }
}

impl fmt::Display for PropertyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.violation {
            None => write!(f, "{}: holds", self.name),
            Some(violation) => write!(f, "{}: VIOLATED ({})", self.name, violation),
        }
    }
}

/// Something that can check a set of invariants.
pub trait PropertyChecker {
    /// Check every invariant and return one result per invariant.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True when every invariant holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Only the failing results.
    fn violations(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.holds).collect()
    }
}
