//! Speech synthesis seam — turn a completed answer into audio bytes.
//!
//! Invoked after completion, never on the streaming path. Best-effort: a
//! failure degrades the audio feature, not the conversation.

use async_trait::async_trait;
use crate::error::SpeechError;

/// An opaque byte-producing collaborator.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// The synthesizer name (e.g., "translate_tts").
    fn name(&self) -> &str;

    /// Synthesize speech for the given text. Returns encoded audio bytes
    /// (implementation-defined format).
    async fn synthesize(&self, text: &str) -> std::result::Result<Vec<u8>, SpeechError>;
}
