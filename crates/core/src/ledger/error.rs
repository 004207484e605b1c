//! Ledger error types.

use chrono::NaiveDate;
use moneyvate_shared::types::GoalId;
use thiserror::Error;

use crate::workflow::types::CompletionStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A record already exists for the date.
    #[error("A completion already exists for {date}")]
    DuplicateEntry {
        /// The contested date.
        date: NaiveDate,
    },

    /// No record exists for the date.
    #[error("No completion recorded for {date}")]
    RecordNotFound {
        /// The requested date.
        date: NaiveDate,
    },

    /// The record moved after the action was validated.
    #[error("Completion for {date} is {actual}, expected {expected}")]
    StatusMismatch {
        /// The date of the record.
        date: NaiveDate,
        /// Status the action was validated against.
        expected: CompletionStatus,
        /// Status found in the ledger.
        actual: CompletionStatus,
    },

    /// The record belongs to another goal.
    #[error("Completion belongs to goal {actual}, not {expected}")]
    ForeignRecord {
        /// This ledger's goal.
        expected: GoalId,
        /// The record's goal.
        actual: GoalId,
    },
}

impl LedgerError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::StatusMismatch { .. } => "STATUS_MISMATCH",
            Self::ForeignRecord { .. } => "FOREIGN_RECORD",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StatusMismatch { .. })
    }
}
