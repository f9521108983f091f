//! PostgreSQL history backend for shared deployments.
//!
//! Same table shape and commit transaction as the SQLite backend; only the
//! placeholder syntax and timestamp storage differ.

use async_trait::async_trait;
use chatrelay_core::error::StorageError;
use chatrelay_core::history::HistoryStore;
use chatrelay_core::turn::Turn;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// A PostgreSQL-backed history store.
pub struct PostgresHistory {
    pool: PgPool,
    capacity: u32,
}

impl PostgresHistory {
    pub async fn new(database_url: &str, capacity: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to connect to Postgres: {e}")))?;

        let store = Self { pool, capacity };
        store.run_migrations().await?;
        info!(capacity, "Postgres history store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        let schema = include_str!("../migrations/001_create_turns.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(format!("turns schema: {e}")))?;
        debug!("Postgres migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &sqlx::postgres::PgRow) -> Result<Turn, StorageError> {
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
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| StorageError::QueryFailed(format!("created_at column: {e}")))?,
        })
    }
}

#[async_trait]
impl HistoryStore for PostgresHistory {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn recent(&self, identity: &str, k: u32) -> Result<Vec<Turn>, StorageError> {
        let rows = sqlx::query(
            "SELECT identity, user_text, ai_text, sequence, created_at \
             FROM turns WHERE identity = $1 \
             ORDER BY sequence DESC LIMIT $2",
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
             VALUES ($1, $2, $3, \
                     (SELECT COALESCE(MAX(sequence), 0) + 1 FROM turns WHERE identity = $1), \
                     $4) \
             RETURNING sequence",
        )
        .bind(identity)
        .bind(user_text)
        .bind(ai_text)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Storage(format!("insert turn: {e}")))?;

        let sequence: i64 = row
            .try_get("sequence")
            .map_err(|e| StorageError::QueryFailed(format!("returned sequence: {e}")))?;

        // Evict at most the single oldest turn, inside the same transaction
        sqlx::query(
            "DELETE FROM turns \
             WHERE identity = $1 \
               AND sequence = (SELECT MIN(sequence) FROM turns WHERE identity = $1) \
               AND (SELECT COUNT(*) FROM turns WHERE identity = $1) > $2",
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
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM turns WHERE identity = $1")
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
