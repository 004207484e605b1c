//! Workflow service for completion state transitions.
//!
//! This module implements the state machine that governs a single
//! completion record. It validates transitions and returns the
//! `CompletionAction` to apply; it never touches the ledger itself.

use chrono::{DateTime, NaiveDate, Utc};
use moneyvate_shared::types::GoalId;

use crate::goal::VerificationMethod;
use crate::ledger::entry::CompletionRecord;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{
    CompletionAction, CompletionStatus, TransitionTrigger, VerificationPayload,
};

/// Stateless service for completion workflow transitions.
pub struct CompletionWorkflow;

impl CompletionWorkflow {
    /// Creates the record for a user attestation.
    ///
    /// Self-verified goals start in `Verified`; photo-verified goals start
    /// in `PendingVerification` and must carry a photo.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::PhotoRequired` for a photo goal without payload.
    pub fn attest(
        goal_id: GoalId,
        date: NaiveDate,
        method: VerificationMethod,
        payload: Option<VerificationPayload>,
        now: DateTime<Utc>,
    ) -> Result<CompletionRecord, WorkflowError> {
        let mut record = CompletionRecord::new(goal_id, date, CompletionStatus::Verified);
        record.verification_photo_url = payload.map(|p| p.photo_url);

        match method {
            VerificationMethod::SelfVerify => {
                record.verified_at = Some(now);
            }
            VerificationMethod::PhotoVerification => {
                if record.verification_photo_url.is_none() {
                    return Err(WorkflowError::PhotoRequired);
                }
                record.status = CompletionStatus::PendingVerification;
            }
        }

        Ok(record)
    }

    /// Creates the backfill record for an elapsed day with no completion.
    #[must_use]
    pub fn missed(goal_id: GoalId, date: NaiveDate) -> CompletionRecord {
        CompletionRecord::new(goal_id, date, CompletionStatus::Missed)
    }

    /// Approve a pending photo verification.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStateTransition` unless pending.
    pub fn approve(
        current: CompletionStatus,
        now: DateTime<Utc>,
    ) -> Result<CompletionAction, WorkflowError> {
        match current {
            CompletionStatus::PendingVerification => Ok(CompletionAction::Approve {
                from: current,
                verified_at: now,
            }),
            _ => Err(WorkflowError::InvalidStateTransition {
                from: current,
                to: CompletionStatus::Verified,
            }),
        }
    }

    /// Reject a pending photo verification.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStateTransition` unless pending.
    pub fn reject(current: CompletionStatus) -> Result<CompletionAction, WorkflowError> {
        match current {
            CompletionStatus::PendingVerification => Ok(CompletionAction::Reject { from: current }),
            _ => Err(WorkflowError::InvalidStateTransition {
                from: current,
                to: CompletionStatus::Rejected,
            }),
        }
    }

    /// Guard that must pass before the payment gateway is called.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStateTransition` unless the status is
    /// `Verified` or `RefundFailed`.
    pub fn ensure_refundable(current: CompletionStatus) -> Result<(), WorkflowError> {
        if current.is_refundable() {
            Ok(())
        } else {
            Err(WorkflowError::InvalidStateTransition {
                from: current,
                to: CompletionStatus::Refunded,
            })
        }
    }

    /// Record a confirmed refund.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStateTransition` unless refundable.
    pub fn refund_succeeded(
        current: CompletionStatus,
        now: DateTime<Utc>,
    ) -> Result<CompletionAction, WorkflowError> {
        Self::ensure_refundable(current)?;
        Ok(CompletionAction::Refund {
            from: current,
            refunded_at: now,
        })
    }

    /// Record a failed or timed-out refund.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStateTransition` unless refundable.
    pub fn refund_failed(
        current: CompletionStatus,
        refund_error: impl Into<String>,
    ) -> Result<CompletionAction, WorkflowError> {
        if !current.is_refundable() {
            return Err(WorkflowError::InvalidStateTransition {
                from: current,
                to: CompletionStatus::RefundFailed,
            });
        }
        Ok(CompletionAction::RefundFail {
            from: current,
            refund_error: refund_error.into(),
        })
    }

    /// Validate a requested status change on behalf of `trigger`.
    ///
    /// Checks the transition graph first, then whether `trigger` is the
    /// party allowed to perform it:
    /// - Verifier → Verified, Rejected
    /// - Gateway → Refunded, RefundFailed
    /// - Reconciliation → Missed (creation only, never a transition)
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidStateTransition` for edges outside the
    /// graph and `WorkflowError::TransitionNotPermitted` for the wrong trigger.
    pub fn transition(
        current: CompletionStatus,
        target: CompletionStatus,
        trigger: TransitionTrigger,
        now: DateTime<Utc>,
    ) -> Result<CompletionAction, WorkflowError> {
        if !Self::is_valid_transition(current, target) {
            return Err(WorkflowError::InvalidStateTransition {
                from: current,
                to: target,
            });
        }

        match (trigger, target) {
            (TransitionTrigger::Verifier, CompletionStatus::Verified) => Self::approve(current, now),
            (TransitionTrigger::Verifier, CompletionStatus::Rejected) => Self::reject(current),
            (TransitionTrigger::Gateway, CompletionStatus::Refunded) => {
                Self::refund_succeeded(current, now)
            }
            (TransitionTrigger::Gateway, CompletionStatus::RefundFailed) => {
                Self::refund_failed(current, "refund reported as failed")
            }
            _ => Err(WorkflowError::TransitionNotPermitted {
                trigger,
                to: target,
            }),
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - PendingVerification → Verified | Rejected
    /// - Verified → Refunded | RefundFailed
    /// - RefundFailed → Refunded | RefundFailed
    #[must_use]
    pub fn is_valid_transition(from: CompletionStatus, to: CompletionStatus) -> bool {
        matches!(
            (from, to),
            (
                CompletionStatus::PendingVerification,
                CompletionStatus::Verified | CompletionStatus::Rejected
            ) | (
                CompletionStatus::Verified | CompletionStatus::RefundFailed,
                CompletionStatus::Refunded | CompletionStatus::RefundFailed
            )
        )
    }
}
