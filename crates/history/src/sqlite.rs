//! SQLite history backend.
//!
//! A single `turns` table holds every identity's log. The capacity bound is
//! enforced inside the commit transaction: the insert and the conditional
//! delete-of-oldest either both apply or neither does, so readers never see
//! a partially-evicted state.

use async_trait::async_trait;
use chatrelay_core::error::StorageError;
use chatrelay_core::history::HistoryStore;
use chatrelay_core::turn::Turn;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A file-backed SQLite history store.
pub struct SqliteHistory {
    pool: SqlitePool,
    capacity: u32,
}

impl SqliteHistory {
    /// Open (or create) the database at `path` with the given per-identity
    /// capacity bound.
    pub async fn new(path: &str, capacity: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool, capacity };
        store.run_migrations().await?;
        info!(path, capacity, "SQLite history store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                identity   TEXT NOT NULL,
                user_text  TEXT NOT NULL,
                ai_text    TEXT NOT NULL,
                sequence   INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("turns table: {e}")))?;

        // Guards sequence uniqueness under concurrent writers for one identity
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_turns_identity_sequence \
             ON turns(identity, sequence)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("identity index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, StorageError> {
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StorageError::QueryFailed(format!("created_at column: {e}")))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Turn {
            identity: row
                .try_get("identity")
                .map_err(|e| StorageError::QueryFailed(format!("identity column: {e}")))?,
            user_text: row
                .try_get("user_text")
                .map_err(|e| StorageError::QueryFailed(format!("user_text column: {e}")))?,
            ai_text: row
                .try_get("ai_text")
                .map_err(|e| StorageError::QueryFailed(format!("ai_text column: {e}")))?,
            sequence: row
                .try_get("sequence")
                .map_err(|e| StorageError::QueryFailed(format!("sequence column: {e}")))?,
            created_at,
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn recent(&self, identity: &str, k: u32) -> Result<Vec<Turn>, StorageError> {
        let rows = sqlx::query(
            "SELECT identity, user_text, ai_text, sequence, created_at \
             FROM turns WHERE identity = ?1 \
             ORDER BY sequence DESC LIMIT ?2",
        )
        .bind(identity)
        .bind(i64::from(k))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("recent turns: {e}")))?;

        rows.iter().map(Self::row_to_turn).collect()
    }

    async fn commit(
        &self,
        identity: &str,
        user_text: &str,
        ai_text: &str,
    ) -> Result<Turn, StorageError> {
        let created_at = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Storage(format!("begin commit: {e}")))?;

        let row = sqlx::query(
            "INSERT INTO turns (identity, user_text, ai_text, sequence, created_at) \
             VALUES (?1, ?2, ?3, \
                     (SELECT COALESCE(MAX(sequence), 0) + 1 FROM turns WHERE identity = ?1), \
                     ?4) \
             RETURNING sequence",
        )
        .bind(identity)
        .bind(user_text)
        .bind(ai_text)
        .bind(created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Storage(format!("insert turn: {e}")))?;

        let sequence: i64 = row
            .try_get("sequence")
            .map_err(|e| StorageError::QueryFailed(format!("returned sequence: {e}")))?;

        // Evict at most the single oldest turn, inside the same transaction
        sqlx::query(
            "DELETE FROM turns \
             WHERE identity = ?1 \
               AND sequence = (SELECT MIN(sequence) FROM turns WHERE identity = ?1) \
               AND (SELECT COUNT(*) FROM turns WHERE identity = ?1) > ?2",
        )
        .bind(identity)
        .bind(i64::from(self.capacity))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Storage(format!("evict oldest turn: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Storage(format!("commit turn: {e}")))?;

        debug!(identity, sequence, "Turn committed");
        Ok(Turn {
            identity: identity.to_string(),
            user_text: user_text.to_string(),
            ai_text: ai_text.to_string(),
            sequence,
            created_at,
        })
    }

    async fn count(&self, identity: &str) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM turns WHERE identity = ?1")
            .bind(identity)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("count turns: {e}")))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| StorageError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(count as usize)
    }
}
