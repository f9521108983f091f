//! HistoryStore trait — the bounded per-identity conversation log.
//!
//! The store exclusively owns the Turn lifecycle: `commit` creates a turn
//! with the next per-identity sequence number and, when the retained count
//! would exceed the capacity bound, removes the single oldest turn for that
//! identity inside the same atomic unit of work. Callers never mutate turns
//! directly.
//!
//! Implementations: SQLite, PostgreSQL, in-memory (for testing).

use async_trait::async_trait;
use crate::error::StorageError;
use crate::turn::Turn;

/// The core history store trait.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// The newest `k` turns for an identity, **newest first** (descending
    /// sequence). Unknown identities yield an empty vec, never an error.
    /// Callers reverse the result before prompt assembly.
    async fn recent(&self, identity: &str, k: u32) -> std::result::Result<Vec<Turn>, StorageError>;

    /// Persist one completed exchange. Assigns the next sequence for the
    /// identity and evicts at most one oldest turn if the capacity bound
    /// would otherwise be exceeded. Insert and eviction are a single atomic
    /// unit: on failure neither is applied.
    async fn commit(
        &self,
        identity: &str,
        user_text: &str,
        ai_text: &str,
    ) -> std::result::Result<Turn, StorageError>;

    /// Number of turns currently retained for an identity.
    async fn count(&self, identity: &str) -> std::result::Result<usize, StorageError>;
}
