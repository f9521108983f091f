//! Streaming relay for chatrelay.
//!
//! Connects the upstream generation service to a session: opens the token
//! stream, suppresses fragments carrying disallowed markers, accumulates
//! the transcript, and reports completion or failure as a single terminal
//! event.

pub mod filter;
pub mod ollama;
pub mod relay;

pub use filter::FragmentFilter;
pub use ollama::OllamaGenerator;
pub use relay::{GenerationRelay, RelayEvent};
