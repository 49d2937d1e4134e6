//! Error types for engine operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by engine components.
///
/// Nothing here is fatal to a running controller: negotiation denials are
/// modeled as data (not errors), and the remaining variants all resolve to
/// "log, skip, retry on the next cycle".
#[derive(Debug, Error)]
pub enum EngineError {
    /// A non-blocking channel write kept failing until the timeout elapsed.
    #[error("channel write timed out after {0:?}")]
    SendTimeout(Duration),
    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// The world-state provider could not produce a snapshot.
    #[error("world state unavailable: {0}")]
    WorldState(String),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
