//! Property-based tests for CompletionLedger.

use chrono::{Duration, NaiveDate};
use moneyvate_shared::types::GoalId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::completions::CompletionLedger;
use super::entry::CompletionRecord;
use crate::workflow::types::CompletionStatus;

fn arb_status() -> impl Strategy<Value = CompletionStatus> {
    prop_oneof![
        Just(CompletionStatus::PendingVerification),
        Just(CompletionStatus::Verified),
        Just(CompletionStatus::Refunded),
        Just(CompletionStatus::RefundFailed),
        Just(CompletionStatus::Rejected),
        Just(CompletionStatus::Missed),
    ]
}

/// Day offsets within a month, with repeats.
fn arb_records() -> impl Strategy<Value = Vec<(i64, CompletionStatus)>> {
    prop::collection::vec((0i64..30, arb_status()), 0..60)
}

fn goal_id() -> GoalId {
    GoalId::from_raw("goal-props").unwrap()
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(offset)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Merging any sequence never produces two records for one date.
    #[test]
    fn prop_merge_keeps_dates_unique(records in arb_records()) {
        let mut ledger = CompletionLedger::new(goal_id(), Decimal::ONE);
        for (offset, status) in &records {
            ledger.merge(CompletionRecord::new(goal_id(), day(*offset), *status)).unwrap();
        }

        let mut dates: Vec<_> = ledger.iter().map(|r| r.date).collect();
        let total = dates.len();
        dates.dedup();
        prop_assert_eq!(dates.len(), total);
        prop_assert!(ledger.len() <= 30);
    }

    /// A missed record merged over an attested date never replaces it.
    #[test]
    fn prop_backfill_never_overwrites_attestation(
        offset in 0i64..30,
        status in arb_status().prop_filter("attested", |s| s.is_attested()),
    ) {
        let mut ledger = CompletionLedger::new(goal_id(), Decimal::ONE);
        ledger.insert(CompletionRecord::new(goal_id(), day(offset), status)).unwrap();
        ledger
            .merge(CompletionRecord::new(goal_id(), day(offset), CompletionStatus::Missed))
            .unwrap();

        prop_assert_eq!(ledger.get(day(offset)).unwrap().status, status);
    }

    /// Earnings are exactly per-success times refunded records.
    #[test]
    fn prop_earned_matches_refunded(
        records in arb_records(),
        per_success in 1i64..100_000,
    ) {
        let per_success = Decimal::new(per_success, 2);
        let mut ledger = CompletionLedger::new(goal_id(), per_success);
        for (offset, status) in &records {
            ledger.merge(CompletionRecord::new(goal_id(), day(*offset), *status)).unwrap();
        }

        let refunded = ledger.count_with_status(CompletionStatus::Refunded);
        let verified = ledger.count_with_status(CompletionStatus::Verified);
        prop_assert_eq!(ledger.earned_amount(), per_success * Decimal::from(refunded));
        prop_assert_eq!(ledger.completed_count() as usize, refunded + verified);
    }

    /// Verified records alone never earn money.
    #[test]
    fn prop_verified_only_earns_nothing(count in 0i64..30) {
        let ledger = CompletionLedger::from_records(
            goal_id(),
            Decimal::TEN,
            (0..count).map(|o| CompletionRecord::new(goal_id(), day(o), CompletionStatus::Verified)),
        )
        .unwrap();

        prop_assert_eq!(ledger.earned_amount(), Decimal::ZERO);
        prop_assert_eq!(i64::from(ledger.completed_count()), count);
    }
}
