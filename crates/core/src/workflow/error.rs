//! Workflow error types for completion lifecycle management.

use thiserror::Error;

use crate::workflow::types::{CompletionStatus, TransitionTrigger};

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Attempted a transition the state machine does not allow.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStateTransition {
        /// The current status.
        from: CompletionStatus,
        /// The attempted target status.
        to: CompletionStatus,
    },

    /// The transition exists but this trigger may not perform it.
    #[error("A {trigger} may not move a completion to {to}")]
    TransitionNotPermitted {
        /// Who asked.
        trigger: TransitionTrigger,
        /// The attempted target status.
        to: CompletionStatus,
    },

    /// Photo-verified goals need a photo to attest.
    #[error("A verification photo is required for this goal")]
    PhotoRequired,
}

impl WorkflowError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::TransitionNotPermitted { .. } => "TRANSITION_NOT_PERMITTED",
            Self::PhotoRequired => "PHOTO_REQUIRED",
        }
    }
}
