//! Run and step status transitions.
//!
//! Both lifecycles are a single fan-out: a record starts in its running state
//! and moves exactly once to a terminal state. The transition functions reject
//! anything else so an invalid write is caught before it reaches storage.

use stepchain_types::workflow::{RunStatus, StepStatus};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid run transition: {from:?} -> {to:?}")]
    Run { from: RunStatus, to: RunStatus },

    #[error("invalid step transition: {from:?} -> {to:?}")]
    Step { from: StepStatus, to: StepStatus },
}

/// Validate a run status transition. Only `Running -> Success` and
/// `Running -> Failed` are legal.
pub fn run_transition(from: RunStatus, to: RunStatus) -> Result<RunStatus, TransitionError> {
    match (from, to) {
        (RunStatus::Running, RunStatus::Success) | (RunStatus::Running, RunStatus::Failed) => {
            Ok(to)
        }
        _ => Err(TransitionError::Run { from, to }),
    }
}

/// Validate a step status transition. Only `Running -> Completed` and
/// `Running -> Failed` are legal.
pub fn step_transition(from: StepStatus, to: StepStatus) -> Result<StepStatus, TransitionError> {
    match (from, to) {
        (StepStatus::Running, StepStatus::Completed) | (StepStatus::Running, StepStatus::Failed) => {
            Ok(to)
        }
        _ => Err(TransitionError::Step { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_running_to_terminal() {
        assert_eq!(
            run_transition(RunStatus::Running, RunStatus::Success),
            Ok(RunStatus::Success)
        );
        assert_eq!(
            run_transition(RunStatus::Running, RunStatus::Failed),
            Ok(RunStatus::Failed)
        );
    }

    #[test]
    fn test_run_terminal_states_are_final() {
        assert!(run_transition(RunStatus::Success, RunStatus::Failed).is_err());
        assert!(run_transition(RunStatus::Failed, RunStatus::Success).is_err());
        assert!(run_transition(RunStatus::Success, RunStatus::Running).is_err());
    }

    #[test]
    fn test_run_no_self_transition() {
        assert!(run_transition(RunStatus::Running, RunStatus::Running).is_err());
    }

    #[test]
    fn test_step_running_to_terminal() {
        assert_eq!(
            step_transition(StepStatus::Running, StepStatus::Completed),
            Ok(StepStatus::Completed)
        );
        assert_eq!(
            step_transition(StepStatus::Running, StepStatus::Failed),
            Ok(StepStatus::Failed)
        );
    }

    #[test]
    fn test_step_terminal_states_are_final() {
        assert!(step_transition(StepStatus::Completed, StepStatus::Failed).is_err());
        assert!(step_transition(StepStatus::Failed, StepStatus::Running).is_err());
    }
}
