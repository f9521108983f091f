//! The relay: drives one generation stream to a terminal event.
//!
//! Consumes token chunks from a [`Generator`], applies the fragment filter,
//! and emits forwardable fragments followed by exactly one terminal event —
//! `Completed` with the full filtered transcript, or `Failed` with a fixed
//! client-facing notice. Single attempt, no retries.

use crate::filter::FragmentFilter;
use chatrelay_core::error::UpstreamError;
use chatrelay_core::generator::{GenerationRequest, Generator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One event on the relay's output channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A filtered fragment of generated text, in upstream order.
    Fragment(String),

    /// The stream finished normally; `transcript` is the concatenation of
    /// every forwarded fragment.
    Completed { transcript: String },

    /// The stream failed; `notice` is the deterministic client-facing
    /// explanation for the failure class.
    Failed { notice: &'static str },
}

/// Relays one generation stream per call to [`run`](Self::run).
#[derive(Clone)]
pub struct GenerationRelay {
    generator: Arc<dyn Generator>,
    blocked_markers: Vec<String>,
    timeout_secs: Option<u64>,
}

impl GenerationRelay {
    pub fn new(
        generator: Arc<dyn Generator>,
        blocked_markers: Vec<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            generator,
            blocked_markers,
            timeout_secs,
        }
    }

    /// Open the upstream stream and drive it in a background task.
    ///
    /// The returned channel carries zero or more `Fragment`s and then
    /// exactly one terminal event, after which it closes.
    pub async fn run(&self, request: GenerationRequest) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(64);

        let mut upstream = match self.generator.stream(request).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "Failed to open generation stream");
                let _ = tx.send(RelayEvent::Failed { notice: e.notice() }).await;
                return rx;
            }
        };

        let markers = self.blocked_markers.clone();
        let timeout_secs = self.timeout_secs;
        let generator_name = self.generator.name().to_string();

        tokio::spawn(async move {
            // One deadline for the whole stream, not per chunk
            let deadline = timeout_secs
                .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
            let mut filter = FragmentFilter::new(markers);
            let mut transcript = String::new();

            loop {
                let item = match deadline {
                    Some(deadline) => {
                        match tokio::time::timeout_at(deadline, upstream.recv()).await {
                            Ok(item) => item,
                            Err(_) => {
                                let e = UpstreamError::Timeout(timeout_secs.unwrap_or_default());
                                warn!(generator = %generator_name, error = %e, "Generation stream timed out");
                                let _ = tx.send(RelayEvent::Failed { notice: e.notice() }).await;
                                return;
                            }
                        }
                    }
                    None => upstream.recv().await,
                };

                match item {
                    Some(Ok(chunk)) => {
                        if !chunk.text.is_empty() {
                            if let Some(forward) = filter.push(&chunk.text) {
                                transcript.push_str(&forward);
                                if tx.send(RelayEvent::Fragment(forward)).await.is_err() {
                                    return; // session gone, stop driving upstream
                                }
                            }
                        }
                        if chunk.done {
                            if let Some(rest) = filter.flush() {
                                transcript.push_str(&rest);
                                if tx.send(RelayEvent::Fragment(rest)).await.is_err() {
                                    return;
                                }
                            }
                            debug!(generator = %generator_name, chars = transcript.len(), "Generation stream completed");
                            let _ = tx.send(RelayEvent::Completed { transcript }).await;
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(generator = %generator_name, error = %e, "Generation stream failed");
                        let _ = tx.send(RelayEvent::Failed { notice: e.notice() }).await;
                        return;
                    }
                    None => {
                        // Upstream closed without a completion marker
                        let e = UpstreamError::Protocol {
                            status_code: 200,
                            message: "stream ended before completion".into(),
                        };
                        warn!(generator = %generator_name, error = %e, "Generation stream truncated");
                        let _ = tx.send(RelayEvent::Failed { notice: e.notice() }).await;
                        return;
                    }
                }
            }
        });

        rx
    }
}
