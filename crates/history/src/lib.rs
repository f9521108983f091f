//! History store backends for chatrelay.
//!
//! Implements [`chatrelay_core::HistoryStore`]: a bounded, append-only
//! per-identity log of conversation turns with single-oldest eviction.
//!
//! Backends:
//! - `sqlite` (default feature) — single-file deployment
//! - `postgres` — shared deployment
//! - in-memory — testing and ephemeral sessions

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryHistory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteHistory;

#[cfg(feature = "postgres")]
pub use postgres::PostgresHistory;
