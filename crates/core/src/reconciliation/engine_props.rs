//! Property-based tests for ReconciliationEngine.

use chrono::{Duration, NaiveDate};
use moneyvate_shared::types::{Currency, GoalId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::ReconciliationEngine;
use crate::frequency::{Frequency, FrequencyPolicy};
use crate::goal::{Goal, GoalDraft, VerificationMethod};
use crate::ledger::{CompletionLedger, CompletionRecord};
use crate::workflow::CompletionStatus;

fn arb_frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::XDays),
        Just(Frequency::Weekdays),
        Just(Frequency::Weekends),
    ]
}

fn arb_status() -> impl Strategy<Value = CompletionStatus> {
    prop_oneof![
        Just(CompletionStatus::PendingVerification),
        Just(CompletionStatus::Verified),
        Just(CompletionStatus::Refunded),
        Just(CompletionStatus::RefundFailed),
        Just(CompletionStatus::Rejected),
    ]
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// A buildable goal, or `None` for weekend goals without a weekend.
fn make_goal(frequency: Frequency, offset: i64, span: i64) -> Option<Goal> {
    let start = base() + Duration::days(offset);
    GoalDraft {
        user_id: UserId::from_raw("user-props").unwrap(),
        title: "Read".to_string(),
        frequency,
        amount_per_success: Decimal::TEN,
        currency: Currency::Usd,
        start_date: start,
        end_date: start + Duration::days(span),
        target_completions: None,
        verification_method: VerificationMethod::SelfVerify,
    }
    .build(GoalId::from_raw("goal-props").unwrap())
    .ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A second pass over the same ledger synthesizes nothing.
    #[test]
    fn prop_reconcile_is_idempotent(
        frequency in arb_frequency(),
        offset in 0i64..400,
        span in 0i64..60,
        today_offset in 0i64..500,
        attested in prop::collection::vec((0i64..60, arb_status()), 0..20),
    ) {
        let Some(goal) = make_goal(frequency, offset, span) else {
            return Ok(());
        };
        let today = base() + Duration::days(today_offset);
        let mut ledger = CompletionLedger::new(goal.id.clone(), goal.amount_per_success);
        for (day, status) in attested {
            let date = goal.start_date + Duration::days(day.min(span));
            ledger.merge(CompletionRecord::new(goal.id.clone(), date, status)).unwrap();
        }

        let first = ReconciliationEngine::reconcile_missed(&goal, &ledger, today);
        ReconciliationEngine::apply_batch(&mut ledger, first).unwrap();
        let snapshot = ledger.clone();

        let second = ReconciliationEngine::reconcile_missed(&goal, &ledger, today);
        prop_assert!(second.is_empty());
        let applied = ReconciliationEngine::apply_batch(&mut ledger, second).unwrap();
        prop_assert!(applied.is_empty());
        prop_assert_eq!(ledger, snapshot);
    }

    /// Backfill stays inside `[start, min(today - 1, end)]` on obligated days
    /// and never touches a date that already has a record.
    #[test]
    fn prop_backfill_bounds(
        frequency in arb_frequency(),
        offset in 0i64..400,
        span in 0i64..60,
        today_offset in 0i64..500,
    ) {
        let Some(goal) = make_goal(frequency, offset, span) else {
            return Ok(());
        };
        let today = base() + Duration::days(today_offset);
        let ledger = CompletionLedger::new(goal.id.clone(), goal.amount_per_success);

        let batch = ReconciliationEngine::reconcile_missed(&goal, &ledger, today);
        for record in &batch {
            prop_assert!(record.date >= goal.start_date);
            prop_assert!(record.date <= goal.end_date);
            prop_assert!(record.date < today);
            prop_assert!(FrequencyPolicy::is_obligated(goal.frequency, record.date));
            prop_assert_eq!(record.status, CompletionStatus::Missed);
        }

        let expected = ReconciliationEngine::scan_end(&goal, today).map_or(0, |end| {
            FrequencyPolicy::obligated_dates(goal.frequency, goal.start_date, end).len()
        });
        prop_assert_eq!(batch.len(), expected);
    }
}
