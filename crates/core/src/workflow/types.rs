//! Workflow domain types for completion lifecycle management.
//!
//! This module defines the completion statuses, who may trigger a
//! transition, and the actions a successful transition produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a completion record.
///
/// The valid transitions are:
/// - PendingVerification → Verified (photo approved)
/// - PendingVerification → Rejected (photo denied)
/// - Verified → Refunded (refund succeeded)
/// - Verified → RefundFailed (refund failed)
/// - RefundFailed → Refunded (retry succeeded)
/// - RefundFailed → RefundFailed (retry failed)
/// - absent → Missed (reconciliation backfill)
///
/// Refunded, Rejected and Missed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionStatus {
    /// Photo submitted, awaiting review.
    PendingVerification,
    /// Completion accepted; eligible for refund.
    Verified,
    /// Money returned to the user (terminal).
    Refunded,
    /// Refund attempt failed; retryable.
    RefundFailed,
    /// Photo denied (terminal).
    Rejected,
    /// Day elapsed without a completion (terminal).
    Missed,
}

impl CompletionStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::PendingVerification,
        Self::Verified,
        Self::Refunded,
        Self::RefundFailed,
        Self::Rejected,
        Self::Missed,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingVerification => "pendingVerification",
            Self::Verified => "verified",
            Self::Refunded => "refunded",
            Self::RefundFailed => "refundFailed",
            Self::Rejected => "rejected",
            Self::Missed => "missed",
        }
    }

    /// Parses a status from its stored string, ignoring case and
    /// surrounding whitespace.
    ///
    /// Returns `None` for unknown statuses.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Rejected | Self::Missed)
    }

    /// Returns true if a refund may be attempted from this status.
    #[must_use]
    pub fn is_refundable(&self) -> bool {
        matches!(self, Self::Verified | Self::RefundFailed)
    }

    /// Counts toward `completed_count`.
    #[must_use]
    pub fn counts_as_completed(&self) -> bool {
        matches!(self, Self::Verified | Self::Refunded)
    }

    /// Counts toward `earned_amount`.
    #[must_use]
    pub fn counts_as_earned(&self) -> bool {
        matches!(self, Self::Refunded)
    }

    /// Returns true if the record is a real attestation rather than a backfill.
    #[must_use]
    pub fn is_attested(&self) -> bool {
        !matches!(self, Self::Missed)
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who asks for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionTrigger {
    /// The user or reviewer deciding on a completion.
    Verifier,
    /// The payment gateway reporting a refund outcome.
    Gateway,
    /// The reconciliation scan backfilling elapsed days.
    Reconciliation,
}

impl fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verifier => write!(f, "verifier"),
            Self::Gateway => write!(f, "gateway"),
            Self::Reconciliation => write!(f, "reconciliation"),
        }
    }
}

/// Evidence attached to an attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    /// Location of the uploaded verification photo.
    pub photo_url: String,
}

/// A validated status transition with the data it writes.
///
/// Each variant records the status it was validated against so the ledger
/// can refuse to apply it if the record moved in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionAction {
    /// Photo verification approved.
    Approve {
        /// Status the action was validated against.
        from: CompletionStatus,
        /// When the completion was verified.
        verified_at: DateTime<Utc>,
    },
    /// Photo verification denied.
    Reject {
        /// Status the action was validated against.
        from: CompletionStatus,
    },
    /// Refund confirmed by the gateway.
    Refund {
        /// Status the action was validated against.
        from: CompletionStatus,
        /// When the refund was confirmed.
        refunded_at: DateTime<Utc>,
    },
    /// Refund failed or timed out.
    RefundFail {
        /// Status the action was validated against.
        from: CompletionStatus,
        /// Failure detail from the gateway.
        refund_error: String,
    },
}

impl CompletionAction {
    /// Returns the status the action was validated against.
    #[must_use]
    pub fn from_status(&self) -> CompletionStatus {
        match self {
            Self::Approve { from, .. }
            | Self::Reject { from }
            | Self::Refund { from, .. }
            | Self::RefundFail { from, .. } => *from,
        }
    }

    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> CompletionStatus {
        match self {
            Self::Approve { .. } => CompletionStatus::Verified,
            Self::Reject { .. } => CompletionStatus::Rejected,
            Self::Refund { .. } => CompletionStatus::Refunded,
            Self::RefundFail { .. } => CompletionStatus::RefundFailed,
        }
    }

    /// Returns true if applying the action should schedule a refund request.
    #[must_use]
    pub fn schedules_refund(&self) -> bool {
        matches!(self, Self::Approve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(CompletionStatus::PendingVerification.as_str(), "pendingVerification");
        assert_eq!(CompletionStatus::Verified.as_str(), "verified");
        assert_eq!(CompletionStatus::Refunded.as_str(), "refunded");
        assert_eq!(CompletionStatus::RefundFailed.as_str(), "refundFailed");
        assert_eq!(CompletionStatus::Rejected.as_str(), "rejected");
        assert_eq!(CompletionStatus::Missed.as_str(), "missed");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            CompletionStatus::parse("pendingVerification"),
            Some(CompletionStatus::PendingVerification)
        );
        assert_eq!(CompletionStatus::parse("REFUNDED"), Some(CompletionStatus::Refunded));
        assert_eq!(CompletionStatus::parse("refundfailed"), Some(CompletionStatus::RefundFailed));
        assert_eq!(CompletionStatus::parse("done"), None);
        assert_eq!(CompletionStatus::parse(" missed "), Some(CompletionStatus::Missed));
    }

    #[test]
    fn test_status_serde_matches_as_str() {
        for status in CompletionStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = CompletionStatus::ALL.into_iter().filter(CompletionStatus::is_terminal).collect();
        assert_eq!(
            terminal,
            vec![CompletionStatus::Refunded, CompletionStatus::Rejected, CompletionStatus::Missed]
        );
    }

    #[test]
    fn test_counting_policies() {
        assert!(CompletionStatus::Verified.counts_as_completed());
        assert!(CompletionStatus::Refunded.counts_as_completed());
        assert!(!CompletionStatus::RefundFailed.counts_as_completed());
        assert!(!CompletionStatus::PendingVerification.counts_as_completed());

        assert!(CompletionStatus::Refunded.counts_as_earned());
        assert!(!CompletionStatus::Verified.counts_as_earned());
    }

    #[test]
    fn test_action_new_status() {
        let now = Utc::now();
        let approve = CompletionAction::Approve {
            from: CompletionStatus::PendingVerification,
            verified_at: now,
        };
        assert_eq!(approve.new_status(), CompletionStatus::Verified);
        assert!(approve.schedules_refund());

        let fail = CompletionAction::RefundFail {
            from: CompletionStatus::Verified,
            refund_error: "card expired".to_string(),
        };
        assert_eq!(fail.new_status(), CompletionStatus::RefundFailed);
        assert_eq!(fail.from_status(), CompletionStatus::Verified);
        assert!(!fail.schedules_refund());
    }
}
