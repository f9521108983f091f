//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chatrelay_core::error::StorageError;
use chatrelay_core::history::HistoryStore;
use chatrelay_core::turn::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store keeping turns in per-identity vectors.
///
/// The write lock spans sequence assignment, insert, and eviction, so a
/// commit is atomic exactly like the SQL backends' transactions.
pub struct InMemoryHistory {
    turns: Arc<RwLock<HashMap<String, Vec<Turn>>>>,
    capacity: usize,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn recent(&self, identity: &str, k: u32) -> Result<Vec<Turn>, StorageError> {
        let turns = self.turns.read().await;
        let Some(log) = turns.get(identity) else {
            return Ok(Vec::new());
        };
        // Stored ascending; return the newest k, newest first.
        Ok(log.iter().rev().take(k as usize).cloned().collect())
    }

    async fn commit(
        &self,
        identity: &str,
        user_text: &str,
        ai_text: &str,
    ) -> Result<Turn, StorageError> {
        let mut turns = self.turns.write().await;
        let log = turns.entry(identity.to_string()).or_default();

        let sequence = log.last().map_or(1, |t| t.sequence + 1);
        let turn = Turn::new(identity, user_text, ai_text, sequence);
        log.push(turn.clone());

        if log.len() > self.capacity {
            log.remove(0);
        }

        Ok(turn)
    }

    async fn count(&self, identity: &str) -> Result<usize, StorageError> {
        let turns = self.turns.read().await;
        Ok(turns.get(identity).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_identity_is_empty_not_an_error() {
        let store = InMemoryHistory::new(100);
        let recent = store.recent("nobody", 4).await.unwrap();
        assert!(recent.is_empty());
        assert_eq!(store.count("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sequences_are_monotonic_per_identity() {
        let store = InMemoryHistory::new(100);
        let a = store.commit("dev-1", "q1", "a1").await.unwrap();
        let b = store.commit("dev-1", "q2", "a2").await.unwrap();
        let other = store.commit("dev-2", "q1", "a1").await.unwrap();

        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(other.sequence, 1); // identities don't share a counter
    }

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let store = InMemoryHistory::new(100);
        for i in 1..=6 {
            store
                .commit("dev-1", &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }

        let recent = store.recent("dev-1", 4).await.unwrap();
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0].user_text, "q6");
        assert_eq!(recent[3].user_text, "q3");
    }

    #[tokio::test]
    async fn eviction_drops_exactly_the_oldest() {
        let store = InMemoryHistory::new(3);
        for i in 1..=3 {
            store
                .commit("dev-1", &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }
        assert_eq!(store.count("dev-1").await.unwrap(), 3);

        store.commit("dev-1", "q4", "a4").await.unwrap();
        assert_eq!(store.count("dev-1").await.unwrap(), 3);

        let recent = store.recent("dev-1", 10).await.unwrap();
        assert_eq!(recent.len(), 3);
        // q1 (sequence 1) is gone; q4 is newest
        assert_eq!(recent[0].user_text, "q4");
        assert!(recent.iter().all(|t| t.user_text != "q1"));
        assert!(recent.iter().all(|t| t.sequence >= 2));
    }

    #[tokio::test]
    async fn concurrent_commits_for_different_identities() {
        let store = Arc::new(InMemoryHistory::new(100));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let identity = format!("dev-{}", i % 4);
                store.commit(&identity, "q", "a").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        for i in 0..4 {
            assert_eq!(store.count(&format!("dev-{i}")).await.unwrap(), 2);
        }
    }
}
