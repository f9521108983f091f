//! Situational-fact providers — clock, weather, and friends.
//!
//! Facts are free-text snippets injected into the system section of the
//! prompt (never into history turns). Providers are best-effort: on any
//! failure they return a fixed placeholder string instead of an error.

use async_trait::async_trait;

/// Request-scoped inputs a provider may use.
#[derive(Debug, Clone, Default)]
pub struct FactContext {
    /// Caller-reported coordinates, when available.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// An opaque string-producing collaborator invoked before context assembly.
#[async_trait]
pub trait FactProvider: Send + Sync {
    /// The provider name (e.g., "clock", "weather").
    fn name(&self) -> &str;

    /// Produce one situational fact. Infallible by contract: implementations
    /// fall back to a fixed placeholder on failure.
    async fn fact(&self, ctx: &FactContext) -> String;
}
