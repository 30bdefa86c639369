//! Error types for Moodwire

use thiserror::Error;

/// Errors that can occur inside the engine.
///
/// Nothing in the core is allowed to panic into the host; fallible paths
/// either return one of these or degrade to "no signal".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to parse input event: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed directive: {0}")]
    DirectiveError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Engine has been torn down")]
    TornDown,
}
