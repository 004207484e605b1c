//! Sync error types.

use chrono::NaiveDate;
use moneyvate_core::goal::GoalError;
use moneyvate_core::ledger::LedgerError;
use moneyvate_core::workflow::WorkflowError;
use moneyvate_shared::types::{GoalId, MoneyError};
use thiserror::Error;

use crate::document::DecodeError;
use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Errors surfaced by the sync coordinator.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No goal with this id in the current session.
    #[error("goal {0} not found")]
    GoalNotFound(GoalId),

    /// The date is outside `[start, min(end, today)]` for the goal.
    #[error("{date} is not an attestable day for goal {goal_id}")]
    DateOutsideGoal {
        /// The goal.
        goal_id: GoalId,
        /// The rejected date.
        date: NaiveDate,
    },

    /// Another transition on the same date has not finished yet.
    #[error("a change to goal {goal_id} on {date} is already in progress")]
    TransitionInFlight {
        /// The goal.
        goal_id: GoalId,
        /// The contested date.
        date: NaiveDate,
    },

    /// The goal has no payment reference to refund against.
    #[error("goal {0} has no payment reference")]
    MissingPaymentReference(GoalId),

    /// Goal validation failed.
    #[error(transparent)]
    Goal(#[from] GoalError),

    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// State machine guard failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A remote document could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Remote read or write failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Payment gateway call failed.
    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    /// Amount could not be expressed in minor units.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// A record could not be encoded for the store.
    #[error("encode failure: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GoalNotFound(_) => "GOAL_NOT_FOUND",
            Self::DateOutsideGoal { .. } => "DATE_OUTSIDE_GOAL",
            Self::TransitionInFlight { .. } => "TRANSITION_IN_FLIGHT",
            Self::MissingPaymentReference(_) => "MISSING_PAYMENT_REFERENCE",
            Self::Goal(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Workflow(e) => e.error_code(),
            Self::Decode(e) => e.error_code(),
            Self::Persistence(e) => e.error_code(),
            Self::Gateway(e) => e.error_code(),
            Self::Money(_) => "INVALID_AMOUNT",
            Self::Encode(_) => "ENCODE_FAILURE",
        }
    }

    /// Returns true if the caller may retry the operation later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransitionInFlight { .. } => true,
            Self::Ledger(e) => e.is_retryable(),
            Self::Persistence(e) => e.is_retryable(),
            Self::Gateway(e) => e.is_retryable(),
            _ => false,
        }
    }
}
