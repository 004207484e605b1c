//! Goal domain types.

use chrono::NaiveDate;
use moneyvate_shared::types::day::serde_day;
use moneyvate_shared::types::{Currency, GoalId, Money, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::frequency::{Frequency, FrequencyPolicy};
use crate::goal::error::GoalError;

/// How a completion is attested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationMethod {
    /// The owner's word is enough; completions start out verified.
    #[serde(alias = "Self Verify")]
    SelfVerify,
    /// A photo must be reviewed; completions start out pending.
    #[serde(alias = "Photo Verification")]
    PhotoVerification,
}

/// A user's goal.
///
/// Invariant: `total_amount == amount_per_success × required_completions()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Goal identifier (document id).
    pub id: GoalId,
    /// Owner.
    pub user_id: UserId,
    /// Display title.
    pub title: String,
    /// Frequency policy kind.
    pub frequency: Frequency,
    /// Amount earned back per refunded completion.
    pub amount_per_success: Decimal,
    /// Currency of all amounts on the goal.
    pub currency: Currency,
    /// First obligated day (inclusive).
    #[serde(with = "serde_day")]
    pub start_date: NaiveDate,
    /// Last obligated day (inclusive).
    #[serde(with = "serde_day")]
    pub end_date: NaiveDate,
    /// Total committed amount.
    pub total_amount: Decimal,
    /// Attestation method.
    pub verification_method: VerificationMethod,
    /// Payment-gateway reference for the original charge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

impl Goal {
    /// Number of completions required by the goal's frequency.
    #[must_use]
    pub fn required_completions(&self) -> u32 {
        FrequencyPolicy::required_completions(
            self.frequency,
            self.start_date,
            self.end_date,
            self.total_amount,
            self.amount_per_success,
        )
    }

    /// Obligated dates across the whole range.
    #[must_use]
    pub fn obligated_dates(&self) -> Vec<NaiveDate> {
        FrequencyPolicy::obligated_dates(self.frequency, self.start_date, self.end_date)
    }

    /// Returns true if `date` lies inside `[start_date, end_date]`.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Committed total as money.
    #[must_use]
    pub fn total(&self) -> Money {
        Money::new(self.total_amount, self.currency)
    }

    /// Amount per success as money.
    #[must_use]
    pub fn per_success(&self) -> Money {
        Money::new(self.amount_per_success, self.currency)
    }

    /// Checks every goal invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), GoalError> {
        if self.title.trim().is_empty() {
            return Err(GoalError::EmptyTitle);
        }
        if self.amount_per_success <= Decimal::ZERO {
            return Err(GoalError::NonPositiveAmount(self.amount_per_success));
        }
        if self.end_date < self.start_date {
            return Err(GoalError::EndBeforeStart);
        }

        let required = self.required_completions();
        if required == 0 {
            return Err(GoalError::NoObligatedDays);
        }

        let expected = self.amount_per_success * Decimal::from(required);
        if expected != self.total_amount {
            return Err(GoalError::TotalMismatch {
                expected,
                actual: self.total_amount,
            });
        }

        Ok(())
    }
}

/// Input for creating a goal.
#[derive(Debug, Clone)]
pub struct GoalDraft {
    /// Owner.
    pub user_id: UserId,
    /// Display title.
    pub title: String,
    /// Frequency policy kind.
    pub frequency: Frequency,
    /// Amount earned back per refunded completion.
    pub amount_per_success: Decimal,
    /// Currency of the stake.
    pub currency: Currency,
    /// First day (inclusive).
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// For `XDays`: how many days the user commits to. Capped at the day count.
    pub target_completions: Option<u32>,
    /// Attestation method.
    pub verification_method: VerificationMethod,
}

impl GoalDraft {
    /// Number of completions this draft will require once built.
    #[must_use]
    pub fn required_completions(&self) -> u32 {
        let day_count = FrequencyPolicy::day_count(self.start_date, self.end_date);
        match self.frequency {
            Frequency::XDays => self.target_completions.unwrap_or(day_count).min(day_count),
            frequency => FrequencyPolicy::required_completions(
                frequency,
                self.start_date,
                self.end_date,
                Decimal::ZERO,
                self.amount_per_success,
            ),
        }
    }

    /// Builds the goal, deriving `total_amount` from the required completions.
    ///
    /// # Errors
    ///
    /// Returns a `GoalError` if the resulting goal violates an invariant.
    pub fn build(self, id: GoalId) -> Result<Goal, GoalError> {
        if self.end_date < self.start_date {
            return Err(GoalError::EndBeforeStart);
        }

        let required = self.required_completions();
        let goal = Goal {
            id,
            user_id: self.user_id,
            title: self.title.trim().to_string(),
            frequency: self.frequency,
            amount_per_success: self.amount_per_success,
            currency: self.currency,
            start_date: self.start_date,
            end_date: self.end_date,
            total_amount: self.amount_per_success * Decimal::from(required),
            verification_method: self.verification_method,
            payment_intent_id: None,
        };

        goal.validate()?;
        Ok(goal)
    }
}
