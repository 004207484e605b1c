//! Document store abstraction.
//!
//! One remote document per goal. Completions live under the
//! `completions.<YYYY-MM-DD>` map inside the goal document.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;
use moneyvate_shared::types::{GoalId, UserId, day_key};
use serde_json::Value;
use thiserror::Error;

/// Field of the goal document that holds the completion map.
pub const COMPLETIONS_FIELD: &str = "completions";

/// Errors reported by a document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("document store call timed out after {0:?}")]
    Timeout(Duration),

    /// The document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store refused the write.
    #[error("document store rejected the write: {0}")]
    Rejected(String),

    /// The field path is empty or addresses a non-object.
    #[error("invalid field path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Timeout(_) => "STORE_TIMEOUT",
            Self::NotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::Rejected(_) => "WRITE_REJECTED",
            Self::InvalidPath(_) => "INVALID_FIELD_PATH",
        }
    }

    /// Returns true if the next reconciliation pass may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// A raw goal document as stored remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Document id (the goal id).
    pub id: String,
    /// Document body.
    pub data: Value,
}

/// The full set of a user's goal documents at one point in time.
///
/// Every snapshot replaces the previous one; it is never a delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalSnapshot {
    /// All goal documents owned by the user.
    pub documents: Vec<RawDocument>,
}

/// Dotted path to a field inside a goal document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    /// Path to the whole completion entry for `date`.
    #[must_use]
    pub fn completion(date: NaiveDate) -> Self {
        Self(format!("{COMPLETIONS_FIELD}.{}", day_key(date)))
    }

    /// Parses a dotted path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` for empty paths or empty segments.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.is_empty() || raw.split('.').any(str::is_empty) {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Path as a dotted string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscribable collection of goal documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Streams full snapshots of the user's goals, starting with the current one.
    async fn subscribe(
        &self,
        user_id: &UserId,
    ) -> Result<BoxStream<'static, Result<GoalSnapshot, StoreError>>, StoreError>;

    /// Writes `value` at `path` inside the goal's document.
    async fn write_field(&self, goal_id: &GoalId, path: &FieldPath, value: Value) -> Result<(), StoreError>;

    /// Reads the goal's document, if it exists.
    async fn read_document(&self, goal_id: &GoalId) -> Result<Option<RawDocument>, StoreError>;

    /// Creates the goal's document.
    async fn create_document(&self, goal_id: &GoalId, data: Value) -> Result<(), StoreError>;
}

/// Runs a store call with a deadline.
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(timeout)))
}
