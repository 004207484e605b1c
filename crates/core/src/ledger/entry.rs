//! Completion record.

use chrono::{DateTime, NaiveDate, Utc};
use moneyvate_shared::types::GoalId;
use moneyvate_shared::types::day::serde_day;
use serde::{Deserialize, Serialize};

use crate::workflow::types::{CompletionAction, CompletionStatus};

/// The ledger entry for one obligated date of one goal.
///
/// `(goal_id, date)` is unique within a ledger. The date never changes;
/// the status changes in place through workflow actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    /// The goal this record belongs to.
    pub goal_id: GoalId,
    /// Calendar day the record covers.
    #[serde(with = "serde_day")]
    pub date: NaiveDate,
    /// Current status.
    pub status: CompletionStatus,
    /// Verification photo reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_photo_url: Option<String>,
    /// When the completion was verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// When the refund was confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
    /// Last refund failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_error: Option<String>,
}

impl CompletionRecord {
    /// Creates a bare record with the given status.
    #[must_use]
    pub fn new(goal_id: GoalId, date: NaiveDate, status: CompletionStatus) -> Self {
        Self {
            goal_id,
            date,
            status,
            verification_photo_url: None,
            verified_at: None,
            refunded_at: None,
            refund_error: None,
        }
    }

    /// The record as it will read once `action` is applied.
    ///
    /// Used to persist an outcome before the ledger is updated.
    #[must_use]
    pub fn transitioned(&self, action: &CompletionAction) -> Self {
        let mut next = self.clone();
        next.apply_unchecked(action);
        next
    }

    /// Writes the action's outcome into the record without checking it.
    ///
    /// Callers validate `action.from_status()` first; see
    /// [`CompletionLedger::apply`](crate::ledger::CompletionLedger::apply).
    pub(crate) fn apply_unchecked(&mut self, action: &CompletionAction) {
        self.status = action.new_status();
        match action {
            CompletionAction::Approve { verified_at, .. } => {
                self.verified_at = Some(*verified_at);
            }
            CompletionAction::Reject { .. } => {}
            CompletionAction::Refund { refunded_at, .. } => {
                self.refunded_at = Some(*refunded_at);
                self.refund_error = None;
            }
            CompletionAction::RefundFail { refund_error, .. } => {
                self.refund_error = Some(refund_error.clone());
            }
        }
    }
}
