//! The Turn value type — one persisted exchange for an identity.
//!
//! A turn is immutable once written: the history store creates it during
//! `commit` and may delete it during eviction, but nothing ever updates one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (user_text, ai_text) exchange persisted for an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Opaque per-user/device key scoping history and eviction.
    pub identity: String,

    /// What the user said.
    pub user_text: String,

    /// What the assistant answered.
    pub ai_text: String,

    /// Monotonically increasing per identity, assigned at write time.
    pub sequence: i64,

    /// When the turn was committed.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Build a turn with the current timestamp. Used by store
    /// implementations; `sequence` is assigned by the store.
    pub fn new(
        identity: impl Into<String>,
        user_text: impl Into<String>,
        ai_text: impl Into<String>,
        sequence: i64,
    ) -> Self {
        Self {
            identity: identity.into(),
            user_text: user_text.into(),
            ai_text: ai_text.into(),
            sequence,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::new("dev-1", "안녕", "안녕하세요", 1);
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.identity, "dev-1");
        assert_eq!(back.user_text, "안녕");
        assert_eq!(back.ai_text, "안녕하세요");
        assert_eq!(back.sequence, 1);
    }
}
