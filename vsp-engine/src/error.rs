//! Error types for the interview engine.

use std::time::Duration;

use thiserror::Error;
use vsp_core::SessionError;

/// Failures from external collaborators (classifier, discovery labeler).
///
/// These never surface to the student: the guarded wrappers recover through
/// the circuit breaker and the deterministic keyword fallbacks.
#[derive(Debug, Error)]
pub enum ExternalServiceError {
    /// The call exceeded its deadline.
    #[error("external call timed out after {0:?}")]
    Timeout(Duration),

    /// The service could not be reached or refused the call.
    #[error("external service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something unusable.
    #[error("malformed external response: {0}")]
    Malformed(String),
}

/// Failures loading or parsing the engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Session store rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A type alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;
