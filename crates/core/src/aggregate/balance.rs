//! Goal progress and user balance calculations.
//!
//! Balance is `Σ (earned − committed)` over a user's goals, where earned
//! counts refunded completions only.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::goal::Goal;
use crate::ledger::CompletionLedger;

/// Progress of one goal against its requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    /// Completions the frequency policy requires.
    pub required_completions: u32,
    /// Verified plus refunded records. May exceed the requirement.
    pub completed_count: u32,
    /// Money earned back so far.
    pub earned_amount: Decimal,
    /// Money committed to the goal.
    pub committed_amount: Decimal,
}

impl GoalProgress {
    /// Completed count capped at the requirement, for display.
    #[must_use]
    pub fn capped_count(&self) -> u32 {
        self.completed_count.min(self.required_completions)
    }

    /// Returns true once the requirement is met.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_count >= self.required_completions
    }

    /// `earned − committed` for this goal.
    #[must_use]
    pub fn contribution(&self) -> Decimal {
        self.earned_amount - self.committed_amount
    }
}

impl fmt::Display for GoalProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.capped_count(), self.required_completions)
    }
}

/// Stateless reducers over goals and their ledgers.
pub struct GoalAggregator;

impl GoalAggregator {
    /// Progress of one goal.
    #[must_use]
    pub fn progress(goal: &Goal, ledger: &CompletionLedger) -> GoalProgress {
        GoalProgress {
            required_completions: goal.required_completions(),
            completed_count: ledger.completed_count(),
            earned_amount: ledger.earned_amount(),
            committed_amount: goal.total_amount,
        }
    }

    /// `earned − committed` for one goal.
    #[must_use]
    pub fn contribution(goal: &Goal, ledger: &CompletionLedger) -> Decimal {
        ledger.earned_amount() - goal.total_amount
    }

    /// Running balance across goals. Zero for an empty set.
    #[must_use]
    pub fn balance<'a>(goals: impl IntoIterator<Item = (&'a Goal, &'a CompletionLedger)>) -> Decimal {
        goals
            .into_iter()
            .map(|(goal, ledger)| Self::contribution(goal, ledger))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use moneyvate_shared::types::{Currency, GoalId, UserId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::frequency::Frequency;
    use crate::goal::{GoalDraft, VerificationMethod};
    use crate::ledger::CompletionRecord;
    use crate::workflow::CompletionStatus;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn goal(id: &str, per_success: Decimal) -> Goal {
        GoalDraft {
            user_id: UserId::from_raw("user-1").unwrap(),
            title: "Meditate".to_string(),
            frequency: Frequency::Daily,
            amount_per_success: per_success,
            currency: Currency::Usd,
            start_date: date(1),
            end_date: date(7),
            target_completions: None,
            verification_method: VerificationMethod::SelfVerify,
        }
        .build(GoalId::from_raw(id).unwrap())
        .unwrap()
    }

    fn ledger(goal: &Goal, statuses: &[CompletionStatus]) -> CompletionLedger {
        CompletionLedger::from_records(
            goal.id.clone(),
            goal.amount_per_success,
            statuses
                .iter()
                .zip(1..)
                .map(|(status, d)| CompletionRecord::new(goal.id.clone(), date(d), *status)),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_balance_is_zero() {
        assert_eq!(GoalAggregator::balance(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn test_balance_sums_contributions() {
        let a = goal("goal-a", dec!(10));
        let b = goal("goal-b", dec!(2.50));
        let ledger_a = ledger(&a, &[CompletionStatus::Refunded, CompletionStatus::Verified]);
        let ledger_b = ledger(&b, &[CompletionStatus::Refunded; 7]);

        assert_eq!(GoalAggregator::contribution(&a, &ledger_a), dec!(-60));
        assert_eq!(GoalAggregator::contribution(&b, &ledger_b), dec!(0));
        assert_eq!(
            GoalAggregator::balance([(&a, &ledger_a), (&b, &ledger_b)]),
            dec!(-60)
        );
    }

    #[rstest]
    #[case(&[], "0/7", false)]
    #[case(&[CompletionStatus::Verified, CompletionStatus::Missed], "1/7", false)]
    #[case(&[CompletionStatus::Refunded; 7], "7/7", true)]
    fn test_progress_display(
        #[case] statuses: &[CompletionStatus],
        #[case] expected: &str,
        #[case] complete: bool,
    ) {
        let goal = goal("goal-a", dec!(10));
        let progress = GoalAggregator::progress(&goal, &ledger(&goal, statuses));
        assert_eq!(progress.to_string(), expected);
        assert_eq!(progress.is_complete(), complete);
    }

    #[test]
    fn test_progress_fields() {
        let goal = goal("goal-a", dec!(10));
        let ledger = ledger(
            &goal,
            &[
                CompletionStatus::Refunded,
                CompletionStatus::Verified,
                CompletionStatus::PendingVerification,
                CompletionStatus::RefundFailed,
            ],
        );
        let progress = GoalAggregator::progress(&goal, &ledger);

        assert_eq!(progress.required_completions, 7);
        assert_eq!(progress.completed_count, 2);
        assert_eq!(progress.earned_amount, dec!(10));
        assert_eq!(progress.committed_amount, dec!(70));
        assert_eq!(progress.contribution(), dec!(-60));
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let goal = goal("goal-a", dec!(10));
        let json = serde_json::to_value(GoalAggregator::progress(&goal, &ledger(&goal, &[]))).unwrap();
        assert_eq!(json["requiredCompletions"], 7);
        assert_eq!(json["completedCount"], 0);
        assert_eq!(json["earnedAmount"], "0");
        assert_eq!(json["committedAmount"], "70");
    }
}
