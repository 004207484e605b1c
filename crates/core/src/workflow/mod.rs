//! Completion workflow management.
//!
//! This module implements the completion lifecycle state machine:
//! who may move a record between statuses, which moves exist at all,
//! and which moves schedule a refund request.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (CompletionStatus, CompletionAction)
//! - `error` - Workflow-specific error types
//! - `service` - State transition logic

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use service::CompletionWorkflow;
pub use types::{CompletionAction, CompletionStatus, TransitionTrigger, VerificationPayload};
