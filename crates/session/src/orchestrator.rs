//! The session orchestrator: one request, one stream, one committed turn.
//!
//! Streaming to the client always comes first; persistence happens after the
//! terminal relay event. A failed commit degrades durability but never the
//! response the client already received.

use crate::assembler::{AssemblyInput, ContextAssembler};
use crate::stream_event::SessionEvent;
use chatrelay_core::generator::{GenerationOptions, GenerationRequest};
use chatrelay_core::history::HistoryStore;
use chatrelay_relay::{GenerationRelay, RelayEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One client request, already validated by the transport layer.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub identity: String,
    pub user_text: String,

    /// Rendered situational facts collected by the caller.
    pub facts: Vec<String>,
}

/// Drives requests through history read, assembly, relay, and commit.
#[derive(Clone)]
pub struct SessionOrchestrator {
    history: Arc<dyn HistoryStore>,
    relay: GenerationRelay,
    assembler: ContextAssembler,
    model: String,
    options: GenerationOptions,
    window: u32,
}

impl SessionOrchestrator {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        relay: GenerationRelay,
        assembler: ContextAssembler,
        model: String,
        options: GenerationOptions,
        window: u32,
    ) -> Self {
        Self {
            history,
            relay,
            assembler,
            model,
            options,
            window,
        }
    }

    /// Run one session. The returned channel yields fragments as
    /// `{message, done: false}` and closes after the terminal
    /// `{message: "", done: true}`.
    ///
    /// Dropping the receiver stops forwarding but not the session: the relay
    /// is drained and a completed transcript is still committed.
    pub fn run(&self, request: SessionRequest) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(64);
        let orchestrator = self.clone();

        tokio::spawn(async move {
            orchestrator.drive(request, tx).await;
        });

        rx
    }

    async fn drive(&self, request: SessionRequest, tx: mpsc::Sender<SessionEvent>) {
        let mut history = match self.history.recent(&request.identity, self.window).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(identity = %request.identity, error = %e, "History read failed, serving without context");
                Vec::new()
            }
        };
        // Store returns newest first; the prompt wants oldest first
        history.reverse();

        let prompt = self.assembler.assemble(&AssemblyInput {
            history: &history,
            user_text: &request.user_text,
            facts: &request.facts,
        });
        debug!(
            identity = %request.identity,
            window = history.len(),
            prompt_chars = prompt.len(),
            "Session assembled"
        );

        let mut events = self
            .relay
            .run(GenerationRequest {
                model: self.model.clone(),
                prompt,
                options: self.options.clone(),
            })
            .await;

        let mut client_gone = false;
        while let Some(event) = events.recv().await {
            match event {
                RelayEvent::Fragment(text) => {
                    if !client_gone && tx.send(SessionEvent::fragment(text)).await.is_err() {
                        debug!(identity = %request.identity, "Client disconnected mid-stream");
                        client_gone = true;
                    }
                }
                RelayEvent::Completed { transcript } => {
                    if !client_gone {
                        let _ = tx.send(SessionEvent::done()).await;
                    }
                    if transcript.is_empty() {
                        debug!(identity = %request.identity, "Empty transcript, nothing to persist");
                    } else if let Err(e) = self
                        .history
                        .commit(&request.identity, &request.user_text, &transcript)
                        .await
                    {
                        warn!(identity = %request.identity, error = %e, "Failed to persist turn");
                    }
                    return;
                }
                RelayEvent::Failed { notice } => {
                    if !client_gone {
                        let _ = tx.send(SessionEvent::fragment(notice)).await;
                        let _ = tx.send(SessionEvent::done()).await;
                    }
                    return;
                }
            }
        }
    }
}
