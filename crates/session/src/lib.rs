//! Session layer for chatrelay.
//!
//! Assembles the model prompt from history, facts, and the new question,
//! then orchestrates one request end-to-end: stream to the client first,
//! persist the finished turn exactly once afterwards.

pub mod assembler;
pub mod orchestrator;
pub mod stream_event;

pub use assembler::{AssemblyInput, ContextAssembler};
pub use orchestrator::{SessionOrchestrator, SessionRequest};
pub use stream_event::SessionEvent;
