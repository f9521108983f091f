//! Generator trait — the abstraction over the upstream generation service.
//!
//! A Generator takes an assembled prompt and returns a channel of token
//! chunks. It is a single-attempt pass-through: it never retries, and it
//! reports failures as error values on the channel (or from the initial
//! call) rather than panicking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::UpstreamError;

/// Sampling and termination options forwarded to the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling randomness (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff.
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Strings that end generation early.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            stop: vec!["<|eot_id|>".into(), "<|end_of_text|>".into()],
        }
    }
}

/// One streaming generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to run (e.g., "llama3:8b").
    pub model: String,

    /// The fully assembled, turn-delimited prompt.
    pub prompt: String,

    /// Sampling options.
    #[serde(default)]
    pub options: GenerationOptions,
}

/// One unit of streamed generated text.
///
/// An absent fragment on the wire becomes an empty `text`, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenChunk {
    #[serde(default)]
    pub text: String,

    /// Whether upstream signalled completion with this chunk.
    #[serde(default)]
    pub done: bool,
}

/// The upstream generation service seam.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this backend (e.g., "ollama").
    fn name(&self) -> &str;

    /// Open a streaming generation call. Chunks arrive on the returned
    /// channel in upstream order; a chunk with `done = true` is the last
    /// successful item. Errors after the stream opened arrive as `Err`
    /// items and terminate the stream.
    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<TokenChunk, UpstreamError>>,
        UpstreamError,
    >;

    /// Health check — can we reach the service?
    async fn health_check(&self) -> std::result::Result<bool, UpstreamError> {
        Ok(true)
    }
}
