//! Error types for the chatrelay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. None of these are
//! process-fatal: a failed request is isolated to its own task.

use thiserror::Error;

/// The top-level error type for all chatrelay operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Upstream generation errors ---
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    // --- History store errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Speech synthesis errors ---
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures while talking to the generation service.
///
/// `notice()` maps each class to a fixed client-facing string so the caller
/// can forward something deterministic downstream without leaking transport
/// detail.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Generation service unreachable: {0}")]
    Unavailable(String),

    #[error("Generation service protocol error: {message} (status: {status_code})")]
    Protocol { status_code: u16, message: String },

    #[error("Generation stream exceeded {0}s")]
    Timeout(u64),
}

impl UpstreamError {
    /// The deterministic fragment forwarded to the client for this failure
    /// class. The raw detail stays in the logs.
    pub fn notice(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "The generation service is unreachable.",
            Self::Protocol { .. } => "The generation service returned an error.",
            Self::Timeout(_) => "The response took too long and was cancelled.",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
#[error("Speech synthesis failed: {0}")]
pub struct SpeechError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_displays_status() {
        let err = Error::Upstream(UpstreamError::Protocol {
            status_code: 503,
            message: "service overloaded".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("service overloaded"));
    }

    #[test]
    fn notices_are_fixed_per_class() {
        let a = UpstreamError::Unavailable("connection refused".into());
        let b = UpstreamError::Unavailable("dns failure".into());
        assert_eq!(a.notice(), b.notice());

        let t = UpstreamError::Timeout(30);
        assert_ne!(t.notice(), a.notice());
        assert!(!t.notice().contains("30"));
    }

    #[test]
    fn storage_error_displays_detail() {
        let err = Error::Storage(StorageError::QueryFailed("no such table: turns".into()));
        assert!(err.to_string().contains("no such table"));
    }
}
