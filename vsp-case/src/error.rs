//! Error types for case loading and validation.

use thiserror::Error;

use crate::types::{BlockId, IntentId};

/// Errors raised while loading or validating a case document.
///
/// These are fatal at startup; the engine never attempts per-request recovery
/// from a malformed case.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Case file could not be read.
    #[error("failed to read case file: {0}")]
    Io(#[from] std::io::Error),

    /// Case document is not valid JSON.
    #[error("failed to parse case document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two blocks share the same ID.
    #[error("duplicate block id: {0}")]
    DuplicateBlock(BlockId),

    /// A mapping, trigger, or ground-truth entry names an unknown block.
    #[error("unknown block id '{block}' referenced by {referrer}")]
    UnknownBlock { block: BlockId, referrer: String },

    /// A block declares an invalid escalation level.
    #[error("block '{block}' has invalid level {level} (must be >= 1)")]
    InvalidLevel { block: BlockId, level: u32 },

    /// A grouped block is missing from any intent mapping or trigger.
    #[error("intent '{0}' maps to no blocks")]
    EmptyMapping(IntentId),
}

/// A type alias for `Result<T, CaseError>`.
pub type Result<T> = std::result::Result<T, CaseError>;
