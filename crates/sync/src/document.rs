//! Goal document codec.
//!
//! Decodes remote goal documents into a [`Goal`] plus its
//! [`CompletionLedger`] and encodes them back. Decoding tolerates the layouts
//! older app versions wrote:
//! - completion keys written as full timestamps
//! - display strings for `frequency` and `verificationMethod`
//! - lowercase or missing currency codes
//! - amounts stored as numbers or strings

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use moneyvate_core::frequency::Frequency;
use moneyvate_core::goal::{Goal, GoalError, VerificationMethod};
use moneyvate_core::ledger::{CompletionLedger, CompletionRecord};
use moneyvate_core::workflow::CompletionStatus;
use moneyvate_shared::types::day::serde_day;
use moneyvate_shared::types::{Currency, GoalId, UserId, day_key, parse_day};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::store::{COMPLETIONS_FIELD, RawDocument};

/// Why a remote goal document could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The document id is blank.
    #[error("goal document has a blank id")]
    MissingId,

    /// The body does not match the goal layout.
    #[error("goal {goal_id} is malformed: {reason}")]
    Malformed {
        /// Document id.
        goal_id: String,
        /// Deserializer message.
        reason: String,
    },

    /// A completion entry could not be decoded.
    #[error("goal {goal_id} has a bad completion at {key}: {reason}")]
    Completion {
        /// Document id.
        goal_id: String,
        /// Raw map key.
        key: String,
        /// What was wrong.
        reason: String,
    },

    /// The goal decoded but breaks a goal invariant.
    #[error("goal {goal_id} violates an invariant: {source}")]
    Invariant {
        /// Document id.
        goal_id: String,
        /// The violated rule.
        source: GoalError,
    },
}

impl DecodeError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingId => "MISSING_ID",
            Self::Malformed { .. } => "MALFORMED_GOAL",
            Self::Completion { .. } => "MALFORMED_COMPLETION",
            Self::Invariant { .. } => "GOAL_INVARIANT",
        }
    }
}

/// A goal and its ledger as decoded from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGoal {
    /// The goal.
    pub goal: Goal,
    /// Its completion ledger.
    pub ledger: CompletionLedger,
}

/// Goal fields as stored remotely, with legacy tolerance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalFields {
    user_id: UserId,
    title: String,
    frequency: Frequency,
    amount_per_success: Decimal,
    #[serde(default, deserialize_with = "lenient_currency")]
    currency: Currency,
    #[serde(with = "serde_day")]
    start_date: NaiveDate,
    #[serde(with = "serde_day")]
    end_date: NaiveDate,
    total_amount: Decimal,
    verification_method: VerificationMethod,
    #[serde(default)]
    payment_intent_id: Option<String>,
    #[serde(default)]
    completions: BTreeMap<String, Value>,
}

/// Completion fields as stored remotely. The map key is authoritative for
/// the date and the document id for the goal.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionFields {
    #[serde(deserialize_with = "lenient_status")]
    status: CompletionStatus,
    #[serde(default)]
    verification_photo_url: Option<String>,
    #[serde(default)]
    verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    refunded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    refund_error: Option<String>,
}

/// Canonical layout written back to the store.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoalDocumentOut<'a> {
    #[serde(flatten)]
    goal: &'a Goal,
    completions: BTreeMap<String, &'a CompletionRecord>,
}

fn lenient_currency<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Currency, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(Currency::default()),
        Some(raw) if raw.trim().is_empty() => Ok(Currency::default()),
        Some(raw) => Currency::from_str(&raw).map_err(serde::de::Error::custom),
    }
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CompletionStatus, D::Error> {
    let raw = String::deserialize(deserializer)?;
    CompletionStatus::parse(raw.trim())
        .ok_or_else(|| serde::de::Error::custom(format!("unknown completion status '{raw}'")))
}

/// Stateless encode/decode of goal documents.
pub struct GoalDocumentCodec;

impl GoalDocumentCodec {
    /// Decodes one goal document.
    ///
    /// Completion keys that normalize to the same day are resolved with the
    /// ledger's merge rule, so an attestation beats a `Missed` backfill.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` describing the first problem found.
    pub fn decode(document: &RawDocument) -> Result<DecodedGoal, DecodeError> {
        let goal_id = GoalId::from_raw(document.id.trim()).map_err(|_| DecodeError::MissingId)?;
        let fields: GoalFields =
            serde_json::from_value(document.data.clone()).map_err(|e| DecodeError::Malformed {
                goal_id: document.id.clone(),
                reason: e.to_string(),
            })?;

        let goal = Goal {
            id: goal_id.clone(),
            user_id: fields.user_id,
            title: fields.title,
            frequency: fields.frequency,
            amount_per_success: fields.amount_per_success,
            currency: fields.currency,
            start_date: fields.start_date,
            end_date: fields.end_date,
            total_amount: fields.total_amount,
            verification_method: fields.verification_method,
            payment_intent_id: fields.payment_intent_id.filter(|id| !id.trim().is_empty()),
        };
        goal.validate().map_err(|source| DecodeError::Invariant {
            goal_id: document.id.clone(),
            source,
        })?;

        let mut ledger = CompletionLedger::new(goal_id.clone(), goal.amount_per_success);
        for record in Self::decode_completions(&goal_id, &fields.completions)? {
            ledger.merge(record).map_err(|e| DecodeError::Completion {
                goal_id: document.id.clone(),
                key: COMPLETIONS_FIELD.to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(DecodedGoal { goal, ledger })
    }

    /// Decodes the completion entries of a document body.
    ///
    /// Used when only the completion map is of interest, e.g. to see what
    /// the store holds before writing a backfill.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Completion` for the first bad entry.
    pub fn completions_of(document: &RawDocument) -> Result<Vec<CompletionRecord>, DecodeError> {
        let goal_id = GoalId::from_raw(document.id.trim()).map_err(|_| DecodeError::MissingId)?;
        let Some(map) = document.data.get(COMPLETIONS_FIELD).and_then(Value::as_object) else {
            return Ok(Vec::new());
        };
        let entries: BTreeMap<String, Value> =
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Self::decode_completions(&goal_id, &entries)
    }

    fn decode_completions(
        goal_id: &GoalId,
        entries: &BTreeMap<String, Value>,
    ) -> Result<Vec<CompletionRecord>, DecodeError> {
        entries
            .iter()
            .map(|(key, value)| {
                let bad = |reason: String| DecodeError::Completion {
                    goal_id: goal_id.to_string(),
                    key: key.clone(),
                    reason,
                };
                let date = parse_day(key).map_err(|e| bad(e.to_string()))?;
                let fields: CompletionFields =
                    serde_json::from_value(value.clone()).map_err(|e| bad(e.to_string()))?;
                Ok(CompletionRecord {
                    goal_id: goal_id.clone(),
                    date,
                    status: fields.status,
                    verification_photo_url: fields.verification_photo_url,
                    verified_at: fields.verified_at,
                    refunded_at: fields.refunded_at,
                    refund_error: fields.refund_error,
                })
            })
            .collect()
    }

    /// Encodes a completion entry for `completions.<date>`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only happens for non-finite data.
    pub fn encode_record(record: &CompletionRecord) -> Result<Value, serde_json::Error> {
        serde_json::to_value(record)
    }

    /// Encodes a full goal document in the canonical layout.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn encode_goal(goal: &Goal, ledger: &CompletionLedger) -> Result<Value, serde_json::Error> {
        let completions = ledger.iter().map(|r| (day_key(r.date), r)).collect();
        serde_json::to_value(GoalDocumentOut { goal, completions })
    }

    /// Wraps an encoded body into a raw document.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_raw(goal: &Goal, ledger: &CompletionLedger) -> Result<RawDocument, serde_json::Error> {
        Ok(RawDocument {
            id: goal.id.to_string(),
            data: Self::encode_goal(goal, ledger)?,
        })
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
