//! Run lifecycle
//!
//! ```text
//! Idle -> Extracting -> Detecting -> Clustering -> Synthesizing -> Packaged
//!            |              |             |              |
//!            +--------------+-------------+--------------+--> Failed
//! ```
//!
//! `Packaged` and `Failed` are terminal. A pipeline run owns one tracker; the
//! visited states end up in the run report.

use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started
    Idle,
    /// Splitting raw text into fragments
    Extracting,
    /// Finding dependency edges
    Detecting,
    /// Building clusters
    Clustering,
    /// Phrasing clusters into requirements
    Synthesizing,
    /// Requirements packaged (terminal)
    Packaged,
    /// Run aborted (terminal)
    Failed,
}

impl RunState {
    /// Check if no transition leaves this state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Packaged | RunState::Failed)
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RunState) -> &'static [RunState] {
    use RunState::{Clustering, Detecting, Extracting, Failed, Idle, Packaged, Synthesizing};
    match from {
        Idle => &[Extracting, Failed],
        Extracting => &[Detecting, Failed],
        Detecting => &[Clustering, Failed],
        Clustering => &[Synthesizing, Failed],
        Synthesizing => &[Packaged, Failed],
        Packaged | Failed => &[],
    }
}

/// Validates a state transition
///
/// # Errors
/// [`StateMachineError::IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// Tracks the state of a single run
#[derive(Debug, Clone)]
pub struct RunTracker {
    current: RunState,
    history: Vec<RunState>,
}

impl RunTracker {
    /// Start in [`RunState::Idle`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn current(&self) -> RunState {
        self.current
    }

    /// Every state visited, in order
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns error if the transition is not allowed; the state is unchanged
    pub fn advance(&mut self, to: RunState) -> Result<(), StateMachineError> {
        validate_transition(self.current, to)?;
        tracing::debug!(from = ?self.current, to = ?to, "run state transition");
        self.current = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to [`RunState::Failed`] unless already terminal
    pub fn fail(&mut self) {
        if validate_transition(self.current, RunState::Failed).is_ok() {
            self.current = RunState::Failed;
            self.history.push(RunState::Failed);
        }
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_packaged() {
        let mut tracker = RunTracker::new();
        for state in [
            RunState::Extracting,
            RunState::Detecting,
            RunState::Clustering,
            RunState::Synthesizing,
            RunState::Packaged,
        ] {
            tracker.advance(state).unwrap();
        }
        assert!(tracker.current().is_terminal());
        assert_eq!(tracker.history().len(), 6);
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut tracker = RunTracker::new();
        tracker.advance(RunState::Extracting).unwrap();
        assert_eq!(
            tracker.advance(RunState::Clustering),
            Err(StateMachineError::IllegalTransition {
                from: RunState::Extracting,
                to: RunState::Clustering,
            })
        );
        assert_eq!(tracker.current(), RunState::Extracting);
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(allowed_transitions(RunState::Packaged).is_empty());
        assert!(validate_transition(RunState::Failed, RunState::Extracting).is_err());

        let mut tracker = RunTracker::new();
        tracker.advance(RunState::Extracting).unwrap();
        tracker.fail();
        tracker.fail();
        assert_eq!(
            tracker.history(),
            &[RunState::Idle, RunState::Extracting, RunState::Failed]
        );
    }

    #[test]
    fn every_non_terminal_state_can_fail() {
        for state in [
            RunState::Idle,
            RunState::Extracting,
            RunState::Detecting,
            RunState::Clustering,
            RunState::Synthesizing,
        ] {
            assert!(validate_transition(state, RunState::Failed).is_ok(), "{state:?}");
        }

        let mut tracker = RunTracker::new();
        tracker.advance(RunState::Failed).unwrap();
        assert_eq!(tracker.history(), &[RunState::Idle, RunState::Failed]);
    }
}
