//! Situational facts injected into the prompt, plus speech synthesis.
//!
//! Fact providers are infallible by contract: a provider that cannot answer
//! returns a fixed placeholder so prompt assembly never blocks on a flaky
//! external service.

pub mod clock;
pub mod tts;
pub mod weather;

pub use clock::ClockFact;
pub use tts::TranslateTts;
pub use weather::WeatherFact;
