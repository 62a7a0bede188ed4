//! vsp-case: immutable clinical case model for the vsp interview engine.
//!
//! A case is authored as a JSON document ([`CaseDocument`]), compiled once at
//! startup into a validated [`Case`], and shared read-only across sessions:
//!
//! - **Information blocks** - [`InformationBlock`], the atomic revealable
//!   units of clinical content, optionally grouped into escalation levels
//!   with prerequisite intents
//! - **Intent mappings** - which blocks each classified intent may reveal
//! - **Contexts** - [`ClinicalContext`] and per-context intent allow-lists
//! - **Bias triggers** - [`BiasTriggerConfig`] and [`GroundTruth`] consumed
//!   by the bias evaluator

pub mod bias;
pub mod block;
pub mod case;
pub mod context;
pub mod document;
pub mod error;
pub mod types;

pub use bias::{AnchoringTriggers, BiasTriggerConfig, ConfirmationTriggers, GroundTruth};
pub use block::{BlockType, InformationBlock};
pub use case::Case;
pub use context::ClinicalContext;
pub use document::{
    AnchoringDocument, BiasTriggersDocument, BlockDocument, CaseDocument, ConfirmationDocument,
    GroundTruthDocument,
};
pub use error::CaseError;
pub use types::{BlockId, CaseId, IntentId};
