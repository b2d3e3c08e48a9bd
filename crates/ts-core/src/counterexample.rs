//! Counterexample representation and rendering.
//!
//! When an invariant is violated, a counterexample shows the operations
//! (and the state after them) that led to the failure.

use std::fmt::Write as _;

/// A counterexample showing the failure path.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// Sequence of state snapshots
    pub states: Vec<StateSnapshot>,
    /// Operations in the order the stack applied them
    pub interleaving: Vec<ThreadAction>,
    /// DST seed for reproduction (if applicable)
    pub dst_seed: Option<u64>,
    /// Human-readable description of the failure
    pub description: Option<String>,
}

/// Snapshot of stack state at a point in time.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number in the execution
    pub step: u64,
    /// Description of the state
    pub description: String,
    /// Variable values at this point
    pub variables: Vec<(String, String)>,
}

/// Operation applied by a thread.
#[derive(Debug, Clone)]
pub struct ThreadAction {
    /// Thread identifier
    pub thread_id: u64,
    /// Step number when this action occurred
    pub step: u64,
    /// Description of the action, e.g. `push(3)`
    pub action: String,
    /// Whether the operation returned a value
    pub success: bool,
}

impl Counterexample {
    /// Create a new empty counterexample.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counterexample with DST seed for reproduction.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            dst_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Set the description for this counterexample.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a state snapshot. Steps must be increasing.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states
                .last()
                .map_or(true, |last| state.step > last.step),
            "States must be added in order"
        );
        self.states.push(state);
    }

    /// Add a thread action.
    pub fn add_action(&mut self, action: ThreadAction) {
        self.interleaving.push(action);
    }

    /// Render the counterexample as text, one operation per line.
    ///
    /// ```text
    /// DST_SEED=12345
    ///
    /// Failure: pop returned 1 but model expected 2
    ///
    ///    1  t0  push(1)
    ///    2  t1  push(2)
    ///    3  t0  pop() -> 1      [FAIL]
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();

        if let Some(seed) = self.dst_seed {
            let _ = writeln!(output, "DST_SEED={seed}\n");
        }

        if let Some(desc) = &self.description {
            let _ = writeln!(output, "Failure: {desc}\n");
        }

        if self.interleaving.is_empty() && self.states.is_empty() {
            output.push_str("(no operations recorded)\n");
            return output;
        }

        for action in &self.interleaving {
            let status = if action.success { "" } else { "  [FAIL]" };
            let _ = writeln!(
                output,
                "{:4}  t{}  {}{}",
                action.step, action.thread_id, action.action, status
            );
        }

        for state in &self.states {
            let _ = write!(output, "\nstep {}: {}", state.step, state.description);
            for (name, value) in &state.variables {
                let _ = write!(output, "\n    {name} = {value}");
            }
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterexample_creation() {
        let ce = Counterexample::new();
        assert!(ce.states.is_empty());
        assert!(ce.interleaving.is_empty());
        assert!(ce.dst_seed.is_none());
        assert_eq!(ce.render(), "(no operations recorded)\n");
    }

    #[test]
    fn test_render_includes_seed_and_actions() {
        let mut ce = Counterexample::with_seed(12345).with_description("lost element 7");
        ce.add_action(ThreadAction {
            thread_id: 0,
            step: 1,
            action: "push(7)".to_string(),
            success: true,
        });
        ce.add_action(ThreadAction {
            thread_id: 1,
            step: 2,
            action: "pop()".to_string(),
            success: false,
        });
        ce.add_state(StateSnapshot {
            step: 2,
            description: "stack empty".to_string(),
            variables: vec![("contents".to_string(), "[]".to_string())],
        });

        let rendered = ce.render();
        assert!(rendered.starts_with("DST_SEED=12345"));
        assert!(rendered.contains("Failure: lost element 7"));
        assert!(rendered.contains("   1  t0  push(7)\n"));
        assert!(rendered.contains("   2  t1  pop()  [FAIL]\n"));
        assert!(rendered.contains("contents = []"));
    }
}
