use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{SessionState, TestId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a session snapshot.
///
/// The session state is kept as an opaque JSON payload so adapters never need
/// to know its layout; decoding happens on the way out and may fail for
/// corrupted rows.
///
/// `pending_submit` is set once the session has been scored but the server
/// has not acknowledged it. Such a snapshot is no longer resumable; it only
/// backs a later retry of the same submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub test_id: TestId,
    pub payload: String,
    pub saved_at: DateTime<Utc>,
    pub pending_submit: Option<String>,
}

impl SnapshotRecord {
    /// Serialize `state` into a record stamped with `saved_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the state cannot be encoded.
    pub fn from_state(state: &SessionState, saved_at: DateTime<Utc>) -> Result<Self, StorageError> {
        let payload = serde_json::to_string(state)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self {
            test_id: state.test_id(),
            payload,
            saved_at,
            pending_submit: None,
        })
    }

    /// Mark the snapshot as scored, carrying the encoded submission that still
    /// has to reach the server.
    #[must_use]
    pub fn with_pending_submit(mut self, submission: String) -> Self {
        self.pending_submit = Some(submission);
        self
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.pending_submit.is_some()
    }

    /// Decode the payload back into a `SessionState`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the payload is not a valid
    /// snapshot, or belongs to a different test than the record key.
    pub fn decode(&self) -> Result<SessionState, StorageError> {
        let state: SessionState = serde_json::from_str(&self.payload)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if state.test_id() != self.test_id {
            return Err(StorageError::Serialization(format!(
                "snapshot keyed {} holds state for {}",
                self.test_id,
                state.test_id()
            )));
        }
        Ok(state)
    }
}

/// Repository contract for resumable session snapshots, one per test.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Insert or replace the snapshot for `record.test_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<(), StorageError>;

    /// Fetch the snapshot for a test, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_snapshot(&self, test_id: TestId) -> Result<Option<SnapshotRecord>, StorageError>;

    /// Remove the snapshot for a test. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_snapshot(&self, test_id: TestId) -> Result<bool, StorageError>;

    /// Tests that currently have a stored snapshot, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_snapshots(&self) -> Result<Vec<TestId>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    snapshots: Arc<Mutex<HashMap<TestId, SnapshotRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.test_id, record.clone());
        Ok(())
    }

    async fn load_snapshot(&self, test_id: TestId) -> Result<Option<SnapshotRecord>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&test_id).cloned())
    }

    async fn delete_snapshot(&self, test_id: TestId) -> Result<bool, StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(&test_id).is_some())
    }

    async fn list_snapshots(&self) -> Result<Vec<TestId>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<_> = guard.values().collect();
        records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(records.into_iter().map(|r| r.test_id).collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub snapshots: Arc<dyn SnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(InMemoryRepository::new());
        Self { snapshots }
    }
}
