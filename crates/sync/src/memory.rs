//! In-memory document store.
//!
//! Backs the operator binary and the test suites. Every successful write
//! publishes a fresh snapshot to subscribers. Writes can be made to fail on
//! purpose to exercise partial-failure paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use moneyvate_shared::types::{GoalId, UserId};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::store::{DocumentStore, FieldPath, GoalSnapshot, RawDocument, StoreError};

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, Value>,
    failing_segments: HashSet<String>,
    unavailable: bool,
    writes: usize,
}

/// Document store held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Mutex<Inner>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            changes: Arc::new(changes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    /// Inserts or replaces a document and notifies subscribers.
    pub fn put_document(&self, id: impl Into<String>, data: Value) {
        self.lock().documents.insert(id.into(), data);
        self.notify();
    }

    /// Removes a document and notifies subscribers.
    pub fn remove_document(&self, id: &str) -> Option<Value> {
        let removed = self.lock().documents.remove(id);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Current body of a document.
    #[must_use]
    pub fn document(&self, id: &str) -> Option<Value> {
        self.lock().documents.get(id).cloned()
    }

    /// Makes every write whose path contains `segment` fail.
    pub fn fail_writes_containing(&self, segment: impl Into<String>) {
        self.lock().failing_segments.insert(segment.into());
    }

    /// Clears injected write failures.
    pub fn clear_failures(&self) {
        self.lock().failing_segments.clear();
    }

    /// Makes every call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of successful field writes and creates.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Snapshot of every document owned by `user_id`.
    #[must_use]
    pub fn snapshot_for(&self, user_id: &UserId) -> GoalSnapshot {
        snapshot_of(&self.lock(), user_id)
    }
}

fn snapshot_of(inner: &Inner, user_id: &UserId) -> GoalSnapshot {
    let documents = inner
        .documents
        .iter()
        .filter(|(_, data)| data.get("userId").and_then(Value::as_str) == Some(user_id.as_str()))
        .map(|(id, data)| RawDocument {
            id: id.clone(),
            data: data.clone(),
        })
        .collect();
    GoalSnapshot { documents }
}

fn check_available(inner: &Inner) -> Result<(), StoreError> {
    if inner.unavailable {
        Err(StoreError::Unavailable("in-memory store switched off".to_string()))
    } else {
        Ok(())
    }
}

/// Writes `value` at `path`, creating intermediate objects.
fn set_path(target: &mut Value, path: &FieldPath, value: Value) -> Result<(), StoreError> {
    let segments: Vec<&str> = path.segments().collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(StoreError::InvalidPath(path.to_string()));
    };

    let mut cursor = target;
    for segment in parents {
        let object = cursor
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        cursor = object
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    cursor
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?
        .insert((*last).to_string(), value);
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn subscribe(
        &self,
        user_id: &UserId,
    ) -> Result<BoxStream<'static, Result<GoalSnapshot, StoreError>>, StoreError> {
        check_available(&self.lock())?;

        let store = self.clone();
        let user_id = user_id.clone();
        let changes = self.changes.subscribe();

        let snapshots = stream::unfold((changes, true), move |(mut changes, first)| {
            let store = store.clone();
            let user_id = user_id.clone();
            async move {
                if !first {
                    changes.changed().await.ok()?;
                }
                let next = {
                    let inner = store.lock();
                    check_available(&inner).map(|()| snapshot_of(&inner, &user_id))
                };
                Some((next, (changes, false)))
            }
        });
        Ok(snapshots.boxed())
    }

    async fn write_field(&self, goal_id: &GoalId, path: &FieldPath, value: Value) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            check_available(&inner)?;
            if path.segments().any(|s| inner.failing_segments.contains(s)) {
                return Err(StoreError::Rejected(format!("injected failure at {path}")));
            }
            let document = inner
                .documents
                .get_mut(goal_id.as_str())
                .ok_or_else(|| StoreError::NotFound(goal_id.to_string()))?;
            set_path(document, path, value)?;
            inner.writes += 1;
        }
        self.notify();
        Ok(())
    }

    async fn read_document(&self, goal_id: &GoalId) -> Result<Option<RawDocument>, StoreError> {
        let inner = self.lock();
        check_available(&inner)?;
        Ok(inner.documents.get(goal_id.as_str()).map(|data| RawDocument {
            id: goal_id.to_string(),
            data: data.clone(),
        }))
    }

    async fn create_document(&self, goal_id: &GoalId, data: Value) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            check_available(&inner)?;
            if inner.documents.contains_key(goal_id.as_str()) {
                return Err(StoreError::Rejected(format!("document {goal_id} already exists")));
            }
            inner.documents.insert(goal_id.to_string(), data);
            inner.writes += 1;
        }
        self.notify();
        Ok(())
    }
}
