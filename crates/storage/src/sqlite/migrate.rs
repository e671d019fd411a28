use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: &[
            "CREATE TABLE IF NOT EXISTS session_snapshots (
                test_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_session_snapshots_saved_at
                ON session_snapshots (saved_at)",
        ],
    },
    // scored sessions whose submission the server has not acknowledged
    Migration {
        version: 2,
        statements: &["ALTER TABLE session_snapshots ADD COLUMN pending_submit TEXT"],
    },
];

/// Apply every snapshot schema migration not yet recorded in
/// `schema_migrations`, each inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(migration.version)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!(version = migration.version, "applied snapshot migration");
    }

    Ok(())
}
