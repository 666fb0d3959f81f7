use crate::error::TransitionError;
use serde::{Deserialize, Serialize};

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PipelineState {
    /// Waiting for a submission
    #[default]
    Idle,
    /// A crew call is in flight; resubmission must be disabled
    Processing,
}

/// Validates a state transition.
pub fn validate_transition(from: PipelineState, to: PipelineState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

pub fn allowed_transitions(from: PipelineState) -> &'static [PipelineState] {
    use PipelineState::*;
    match from {
        Idle => &[Processing],
        Processing => &[Idle],
    }
}
