use exam_core::model::TestId;
use sqlx::Row;

use crate::repository::{SnapshotRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn test_id_from_str(raw: &str) -> Result<TestId, StorageError> {
    raw.parse::<TestId>().map_err(ser)
}

pub(crate) fn test_id_to_string(id: TestId) -> String {
    id.value().hyphenated().to_string()
}

pub(crate) fn map_snapshot_row(row: &sqlx::sqlite::SqliteRow) -> Result<SnapshotRecord, StorageError> {
    let test_id = test_id_from_str(&row.try_get::<String, _>("test_id").map_err(ser)?)?;
    let payload: String = row.try_get("payload").map_err(ser)?;
    let saved_at = row.try_get("saved_at").map_err(ser)?;
    let pending_submit: Option<String> = row.try_get("pending_submit").map_err(ser)?;
    Ok(SnapshotRecord {
        test_id,
        payload,
        saved_at,
        pending_submit,
    })
}
