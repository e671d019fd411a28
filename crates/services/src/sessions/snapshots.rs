use std::sync::Arc;

use serde::{Deserialize, Serialize};

use exam_core::model::{MockTestDetail, SessionState, TestId, TestResult};
use exam_core::Clock;
use storage::repository::{SnapshotRecord, SnapshotRepository, StorageError};

use crate::api::SubmitPayload;

/// A scored session whose submission has not reached the server yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub result: TestResult,
    pub payload: SubmitPayload,
}

/// What a stored snapshot holds for a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    /// An attempt in progress that can be resumed.
    InProgress(SessionState),
    /// A finished attempt that may only be re-sent, never reopened.
    AwaitingSubmit {
        state: SessionState,
        submission: PendingSubmission,
    },
}

/// Local persistence for resumable sessions, one snapshot per test.
#[derive(Clone)]
pub struct SnapshotStore {
    repo: Arc<dyn SnapshotRepository>,
    clock: Clock,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(repo: Arc<dyn SnapshotRepository>, clock: Clock) -> Self {
        Self { repo, clock }
    }

    /// Write the full state, replacing any earlier snapshot for its test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, state: &SessionState) -> Result<(), StorageError> {
        let record = SnapshotRecord::from_state(state, self.clock.now())?;
        self.repo.save_snapshot(&record).await
    }

    /// Write the final state together with the submission still owed to the
    /// server. Later loads report it as `AwaitingSubmit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save_submitted(
        &self,
        state: &SessionState,
        submission: &PendingSubmission,
    ) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(submission)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let record =
            SnapshotRecord::from_state(state, self.clock.now())?.with_pending_submit(encoded);
        self.repo.save_snapshot(&record).await
    }

    /// Load a usable snapshot for `detail`.
    ///
    /// A snapshot that cannot be decoded or no longer fits the test is
    /// deleted and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only if the repository itself fails.
    pub async fn load(&self, detail: &MockTestDetail) -> Result<Option<StoredSession>, StorageError> {
        let test_id = detail.id();
        let Some(record) = self.repo.load_snapshot(test_id).await? else {
            return Ok(None);
        };

        match decode_stored(&record, detail) {
            Ok(stored) => Ok(Some(stored)),
            Err(err) => {
                tracing::warn!(test = %test_id, error = %err, "discarding unusable snapshot");
                if let Err(err) = self.repo.delete_snapshot(test_id).await {
                    tracing::warn!(test = %test_id, error = %err, "failed to delete snapshot");
                }
                Ok(None)
            }
        }
    }

    /// Delete the snapshot for `test_id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    pub async fn clear(&self, test_id: TestId) -> Result<bool, StorageError> {
        self.repo.delete_snapshot(test_id).await
    }

    /// Tests with a stored snapshot, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    pub async fn list(&self) -> Result<Vec<TestId>, StorageError> {
        self.repo.list_snapshots().await
    }
}

fn decode_stored(
    record: &SnapshotRecord,
    detail: &MockTestDetail,
) -> Result<StoredSession, StorageError> {
    let state = record.decode()?;
    state
        .validate_against(detail)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let Some(encoded) = record.pending_submit.as_deref() else {
        return Ok(StoredSession::InProgress(state));
    };
    let submission: PendingSubmission = serde_json::from_str(encoded)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    if submission.result.test_id != record.test_id {
        return Err(StorageError::Serialization(format!(
            "pending submission for {} stored under {}",
            submission.result.test_id, record.test_id
        )));
    }
    Ok(StoredSession::AwaitingSubmit { state, submission })
}
