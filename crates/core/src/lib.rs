//! # chatrelay Core
//!
//! Domain types, traits, and error definitions for the chatrelay streaming
//! conversation pipeline. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the history
//! store, the upstream generator, situational-fact providers, and speech
//! synthesis. Implementations live in their respective crates, which keeps
//! the dependency graph pointing inward and makes each seam mockable.

pub mod error;
pub mod facts;
pub mod generator;
pub mod history;
pub mod speech;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, SpeechError, StorageError, UpstreamError};
pub use facts::{FactContext, FactProvider};
pub use generator::{GenerationOptions, GenerationRequest, Generator, TokenChunk};
pub use history::HistoryStore;
pub use speech::SpeechSynthesizer;
pub use turn::Turn;
