//! Unit tests for the completion ledger.

use super::*;
use chrono::Utc;
use rust_decimal_macros::dec;

fn goal_id() -> GoalId {
    GoalId::from_raw("goal-1").unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn record(d: u32, status: CompletionStatus) -> CompletionRecord {
    CompletionRecord::new(goal_id(), day(d), status)
}

fn ledger() -> CompletionLedger {
    CompletionLedger::new(goal_id(), dec!(10))
}

#[test]
fn test_insert_and_get() {
    let mut ledger = ledger();
    ledger.insert(record(1, CompletionStatus::Verified)).unwrap();

    assert!(ledger.contains(day(1)));
    assert_eq!(ledger.get(day(1)).unwrap().status, CompletionStatus::Verified);
    assert_eq!(ledger.len(), 1);
    assert!(!ledger.is_empty());
}

#[test]
fn test_insert_duplicate_date_keeps_existing() {
    let mut ledger = ledger();
    ledger.insert(record(1, CompletionStatus::Verified)).unwrap();

    let result = ledger.insert(record(1, CompletionStatus::Missed));

    assert_eq!(result, Err(LedgerError::DuplicateEntry { date: day(1) }));
    assert_eq!(ledger.get(day(1)).unwrap().status, CompletionStatus::Verified);
}

#[test]
fn test_insert_foreign_record_rejected() {
    let mut ledger = ledger();
    let foreign = CompletionRecord::new(
        GoalId::from_raw("goal-2").unwrap(),
        day(1),
        CompletionStatus::Verified,
    );

    assert!(matches!(
        ledger.insert(foreign),
        Err(LedgerError::ForeignRecord { .. })
    ));
    assert!(ledger.is_empty());
}

#[test]
fn test_from_records_rejects_duplicates() {
    let result = CompletionLedger::from_records(
        goal_id(),
        dec!(10),
        [
            record(1, CompletionStatus::Verified),
            record(1, CompletionStatus::Refunded),
        ],
    );
    assert_eq!(result, Err(LedgerError::DuplicateEntry { date: day(1) }));
}

#[test]
fn test_completed_and_earned_counts() {
    let ledger = CompletionLedger::from_records(
        goal_id(),
        dec!(10),
        [
            record(1, CompletionStatus::Verified),
            record(2, CompletionStatus::Refunded),
            record(3, CompletionStatus::Refunded),
            record(4, CompletionStatus::PendingVerification),
            record(5, CompletionStatus::Missed),
            record(6, CompletionStatus::Rejected),
            record(7, CompletionStatus::RefundFailed),
        ],
    )
    .unwrap();

    assert_eq!(ledger.completed_count(), 3);
    assert_eq!(ledger.earned_amount(), dec!(20));
    assert_eq!(ledger.count_with_status(CompletionStatus::Refunded), 2);
}

#[test]
fn test_verified_without_refund_earns_nothing() {
    let ledger = CompletionLedger::from_records(
        goal_id(),
        dec!(10),
        (1..=5).map(|d| record(d, CompletionStatus::Verified)),
    )
    .unwrap();

    assert_eq!(ledger.completed_count(), 5);
    assert_eq!(ledger.earned_amount(), dec!(0));
}

#[test]
fn test_has_completion_for_date() {
    let ledger = CompletionLedger::from_records(
        goal_id(),
        dec!(10),
        [
            record(1, CompletionStatus::Verified),
            record(2, CompletionStatus::PendingVerification),
            record(3, CompletionStatus::Refunded),
            record(4, CompletionStatus::Missed),
        ],
    )
    .unwrap();

    assert!(ledger.has_completion_for_date(day(1)));
    assert!(ledger.has_completion_for_date(day(2)));
    assert!(!ledger.has_completion_for_date(day(3)));
    assert!(!ledger.has_completion_for_date(day(4)));
    assert!(!ledger.has_completion_for_date(day(9)));
}

#[test]
fn test_apply_moves_status() {
    let mut ledger = ledger();
    ledger.insert(record(1, CompletionStatus::Verified)).unwrap();

    let action = CompletionAction::Refund {
        from: CompletionStatus::Verified,
        refunded_at: Utc::now(),
    };
    let updated = ledger.apply(day(1), &action).unwrap();

    assert_eq!(updated.status, CompletionStatus::Refunded);
    assert_eq!(ledger.earned_amount(), dec!(10));
}

#[test]
fn test_apply_missing_record() {
    let mut ledger = ledger();
    let action = CompletionAction::Reject {
        from: CompletionStatus::PendingVerification,
    };
    assert_eq!(
        ledger.apply(day(1), &action).unwrap_err(),
        LedgerError::RecordNotFound { date: day(1) }
    );
}

#[test]
fn test_apply_stale_action() {
    let mut ledger = ledger();
    ledger.insert(record(1, CompletionStatus::Refunded)).unwrap();

    let action = CompletionAction::Refund {
        from: CompletionStatus::Verified,
        refunded_at: Utc::now(),
    };
    let err = ledger.apply(day(1), &action).unwrap_err();

    assert_eq!(
        err,
        LedgerError::StatusMismatch {
            date: day(1),
            expected: CompletionStatus::Verified,
            actual: CompletionStatus::Refunded,
        }
    );
    assert!(err.is_retryable());
}

#[test]
fn test_settle_accepts_echoed_status() {
    let mut ledger = ledger();
    ledger.insert(record(1, CompletionStatus::PendingVerification)).unwrap();
    ledger.insert(record(2, CompletionStatus::Verified)).unwrap();
    ledger.insert(record(3, CompletionStatus::Missed)).unwrap();
    let approve = CompletionAction::Approve {
        from: CompletionStatus::PendingVerification,
        verified_at: Utc::now(),
    };

    assert!(ledger.settle(day(1), &approve).unwrap());
    assert!(!ledger.settle(day(2), &approve).unwrap());
    assert_eq!(ledger.get(day(2)).unwrap().status, CompletionStatus::Verified);
    assert!(matches!(
        ledger.settle(day(3), &approve).unwrap_err(),
        LedgerError::StatusMismatch { actual: CompletionStatus::Missed, .. }
    ));
    assert_eq!(
        ledger.settle(day(4), &approve).unwrap_err(),
        LedgerError::RecordNotFound { date: day(4) }
    );
}

#[test]
fn test_merge_rules() {
    let mut ledger = ledger();

    assert_eq!(
        ledger.merge(record(1, CompletionStatus::Missed)).unwrap(),
        MergeOutcome::Inserted
    );
    assert_eq!(
        ledger.merge(record(1, CompletionStatus::Missed)).unwrap(),
        MergeOutcome::Unchanged
    );
    assert_eq!(
        ledger.merge(record(1, CompletionStatus::Verified)).unwrap(),
        MergeOutcome::ReplacedBackfill
    );
    assert_eq!(ledger.get(day(1)).unwrap().status, CompletionStatus::Verified);

    assert_eq!(
        ledger.merge(record(1, CompletionStatus::Missed)).unwrap(),
        MergeOutcome::KeptExisting
    );
    assert_eq!(
        ledger.merge(record(1, CompletionStatus::PendingVerification)).unwrap(),
        MergeOutcome::KeptExisting
    );
    assert_eq!(ledger.get(day(1)).unwrap().status, CompletionStatus::Verified);
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_iter_is_date_ordered() {
    let ledger = CompletionLedger::from_records(
        goal_id(),
        dec!(10),
        [
            record(5, CompletionStatus::Missed),
            record(2, CompletionStatus::Verified),
            record(9, CompletionStatus::Refunded),
        ],
    )
    .unwrap();

    let dates: Vec<_> = ledger.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![day(2), day(5), day(9)]);
}
