//! vsp-engine: the progressive disclosure interview engine.
//!
//! Ties the immutable case model (`vsp-case`) and the session store
//! (`vsp-core`) together into a query-driven simulation:
//!
//! - **Classification** - [`IntentClassifier`] maps free-text doctor queries
//!   to clinical intents; [`GuardedClassifier`] adds a timeout, a circuit
//!   breaker, and the deterministic [`KeywordClassifier`] fallback
//! - **Disclosure** - [`DisclosureResolver`] turns intents into block
//!   revelations with context filtering, prerequisite gating, and group
//!   escalation
//! - **Presentation** - [`DiscoveryLabeler`] labels revelations;
//!   [`ResponderSet`] renders persona responses per context
//! - **Bias detection** - [`BiasMonitor`] for real-time warnings,
//!   [`BiasEvaluator`] for the end-of-session [`BiasReport`]
//!
//! [`InterviewEngine`] is the facade most callers want.

pub mod bias;
pub mod breaker;
pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod labeler;
pub mod resolver;
pub mod responder;
pub mod stats;

pub use bias::{
    AnchoringAnalysis, BiasConfig, BiasEvaluator, BiasMonitor, BiasReport, BiasType, BiasWarning,
    ClosureAnalysis, ConfirmationAnalysis, IntentTaxonomy,
};
pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use classify::{
    CLARIFICATION_INTENT, GuardedClassifier, IntentClassification, IntentClassifier,
    KeywordClassifier,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, GuardConfig};
pub use engine::{DiagnosisOutcome, Discovery, EngineBuilder, InterviewEngine, QueryOutcome};
pub use error::{ConfigError, EngineError, ExternalServiceError};
pub use labeler::{DiscoveryLabel, DiscoveryLabeler, GuardedLabeler, KeywordLabeler};
pub use resolver::{DisclosureResolver, Resolution};
pub use responder::{
    ClinicalDatum, CompanionResponder, ExamResponder, LabsResponder, Responder, ResponderSet,
};
pub use stats::{CategoryBreakdown, CategorySummary, DiscoveryStats};
