//! Goal validation errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when a goal violates its construction rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GoalError {
    /// Title is empty.
    #[error("Goal title must not be empty")]
    EmptyTitle,

    /// Amount per success must be strictly positive.
    #[error("Amount per success must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// End date precedes start date.
    #[error("Goal ends before it starts")]
    EndBeforeStart,

    /// The frequency obliges no day in the range.
    #[error("Goal has no obligated days in its range")]
    NoObligatedDays,

    /// Total amount does not equal amount per success times required completions.
    #[error("Total amount {actual} does not match expected {expected}")]
    TotalMismatch {
        /// amount_per_success × required_completions.
        expected: Decimal,
        /// Stored total amount.
        actual: Decimal,
    },
}

impl GoalError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "EMPTY_TITLE",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::EndBeforeStart => "END_BEFORE_START",
            Self::NoObligatedDays => "NO_OBLIGATED_DAYS",
            Self::TotalMismatch { .. } => "TOTAL_MISMATCH",
        }
    }
}
