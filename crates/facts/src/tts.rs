//! Speech synthesis via the Google Translate TTS endpoint.
//!
//! The endpoint caps input length, so text is clipped to its first 200
//! characters before the request. The MP3 bytes come back directly; no
//! temp files.

use async_trait::async_trait;
use chatrelay_core::error::SpeechError;
use chatrelay_core::speech::SpeechSynthesizer;
use tracing::debug;

const MAX_CHARS: usize = 200;

pub struct TranslateTts {
    client: reqwest::Client,
    language: String,
}

impl TranslateTts {
    pub fn new(language: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            language: language.into(),
        }
    }
}

fn clip(text: &str) -> String {
    text.chars().take(MAX_CHARS).collect()
}

#[async_trait]
impl SpeechSynthesizer for TranslateTts {
    fn name(&self) -> &str {
        "translate_tts"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let clipped = clip(text);
        debug!(chars = clipped.chars().count(), language = %self.language, "Synthesizing speech");

        let response = self
            .client
            .get("https://translate.google.com/translate_tts")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", clipped.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SpeechError(e.to_string()))?
            .error_for_status()
            .map_err(|e| SpeechError(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
