//! Read-only view of the session's ledgers.

use moneyvate_core::aggregate::{GoalAggregator, GoalProgress};
use moneyvate_core::goal::Goal;
use moneyvate_core::ledger::CompletionLedger;
use moneyvate_shared::types::{Currency, GoalId};
use rust_decimal::Decimal;
use serde::Serialize;

/// One goal as shown to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    /// Goal identifier.
    pub goal_id: GoalId,
    /// Display title.
    pub title: String,
    /// Currency of the goal's amounts.
    pub currency: Currency,
    /// Progress against the requirement.
    pub progress: GoalProgress,
}

/// Balance and per-goal progress, republished after every ledger change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerProjection {
    /// `Σ (earned − committed)` over all goals.
    pub balance: Decimal,
    /// Goals in id order.
    pub goals: Vec<GoalSummary>,
}

impl LedgerProjection {
    /// Builds the projection from goals and their ledgers.
    pub fn build<'a>(books: impl IntoIterator<Item = (&'a Goal, &'a CompletionLedger)> + Clone) -> Self {
        let goals = books
            .clone()
            .into_iter()
            .map(|(goal, ledger)| GoalSummary {
                goal_id: goal.id.clone(),
                title: goal.title.clone(),
                currency: goal.currency,
                progress: GoalAggregator::progress(goal, ledger),
            })
            .collect();
        Self {
            balance: GoalAggregator::balance(books),
            goals,
        }
    }

    /// Summary for one goal.
    #[must_use]
    pub fn goal(&self, goal_id: &GoalId) -> Option<&GoalSummary> {
        self.goals.iter().find(|g| &g.goal_id == goal_id)
    }
}
