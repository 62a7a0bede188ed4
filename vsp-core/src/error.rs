//! Error types for session state management.

use thiserror::Error;
use vsp_case::BlockId;

use crate::session::SessionId;

/// Errors related to session store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the given ID.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The case defines no block with the given ID.
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    /// A final diagnosis was already submitted for this session.
    #[error("session already completed: {0}")]
    SessionAlreadyCompleted(SessionId),
}

/// A type alias for `Result<T, SessionError>`.
pub type Result<T> = std::result::Result<T, SessionError>;
