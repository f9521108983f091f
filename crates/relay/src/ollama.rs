//! Ollama generation client.
//!
//! Talks to `POST /api/generate` with `stream: true` and parses the
//! newline-delimited JSON reply, one `{"response", "done"}` object per line.

use async_trait::async_trait;
use chatrelay_core::error::UpstreamError;
use chatrelay_core::generator::{GenerationRequest, Generator, TokenChunk};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

/// A streaming client for an Ollama-compatible generation service.
pub struct OllamaGenerator {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    /// Create a new client for the service at `base_url`.
    ///
    /// Only connection establishment is bounded here; the overall stream
    /// duration is the relay's concern.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn parse_line(line: &str) -> std::result::Result<TokenChunk, UpstreamError> {
        serde_json::from_str::<ApiLine>(line)
            .map(|l| TokenChunk {
                text: l.response,
                done: l.done,
            })
            .map_err(|e| UpstreamError::Protocol {
                status_code: 200,
                message: format!("Malformed stream line: {e}"),
            })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<TokenChunk, UpstreamError>>,
        UpstreamError,
    > {
        let url = format!("{}/api/generate", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": true,
            "options": {
                "temperature": request.options.temperature,
                "top_p": request.options.top_p,
                "stop": request.options.stop,
            },
        });

        debug!(model = %request.model, "Opening generation stream");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generation service returned error");
            return Err(UpstreamError::Protocol {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the NDJSON byte stream and forward one chunk per line
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = LineBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(UpstreamError::Unavailable(e.to_string()))).await;
                        return;
                    }
                };

                for line in buffer.push(&bytes) {
                    if line.is_empty() {
                        continue;
                    }

                    match Self::parse_line(&line) {
                        Ok(chunk) => {
                            let done = chunk.done;
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // receiver dropped
                            }
                            if done {
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // An unterminated tail is only acceptable when it carries the
            // completion marker; anything else is a truncated stream, and
            // closing the channel lets the relay classify it.
            if let Some(trailing) = buffer.take_remainder() {
                if let Ok(chunk) = Self::parse_line(&trailing) {
                    if chunk.done {
                        let _ = tx.send(Ok(chunk)).await;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> std::result::Result<bool, UpstreamError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// A single NDJSON line from `/api/generate`.
#[derive(Debug, Deserialize)]
struct ApiLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Accumulates raw bytes and yields complete lines.
///
/// Network reads can split a multibyte character across chunks, so decoding
/// happens per complete line, never per chunk.
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append a chunk; returns every line completed by it, in order,
    /// without the trailing newline (or CRLF).
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.bytes.iter().position(|&b| b == b'\n') {
            let rest = self.bytes.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.bytes, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left after the stream ended, if non-blank.
    fn take_remainder(&mut self) -> Option<String> {
        let bytes = std::mem::take(&mut self.bytes);
        let trailing = String::from_utf8_lossy(&bytes).trim().to_string();
        if trailing.is_empty() { None } else { Some(trailing) }
    }
}
