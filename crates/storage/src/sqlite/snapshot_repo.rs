use exam_core::model::TestId;
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{map_snapshot_row, test_id_from_str, test_id_to_string},
};
use crate::repository::{SnapshotRecord, SnapshotRepository, StorageError};

#[async_trait::async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO session_snapshots (test_id, payload, saved_at, pending_submit)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(test_id) DO UPDATE SET
                    payload = excluded.payload,
                    saved_at = excluded.saved_at,
                    pending_submit = excluded.pending_submit
            ",
        )
        .bind(test_id_to_string(record.test_id))
        .bind(&record.payload)
        .bind(record.saved_at)
        .bind(record.pending_submit.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn load_snapshot(&self, test_id: TestId) -> Result<Option<SnapshotRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT test_id, payload, saved_at, pending_submit
                FROM session_snapshots
                WHERE test_id = ?1
            ",
        )
        .bind(test_id_to_string(test_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_snapshot_row).transpose()
    }

    async fn delete_snapshot(&self, test_id: TestId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM session_snapshots WHERE test_id = ?1")
            .bind(test_id_to_string(test_id))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }

    async fn list_snapshots(&self) -> Result<Vec<TestId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT test_id
                FROM session_snapshots
                ORDER BY saved_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let raw: String = row
                    .try_get("test_id")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                test_id_from_str(&raw)
            })
            .collect()
    }
}
