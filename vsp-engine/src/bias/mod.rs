//! Cognitive bias detection.
//!
//! Two layers share the case's trigger configuration:
//!
//! - [`BiasMonitor`] runs after every interaction and emits at most one
//!   [`BiasWarning`] for immediate feedback, checking anchoring, then
//!   confirmation, then premature closure
//! - [`BiasEvaluator`] runs once at diagnosis submission and produces the
//!   full [`BiasReport`] with per-bias findings and an overall score
//!
//! Both operate on session snapshots; neither holds locks or mutates state.
//! A bias whose triggers are absent from the case is reported as not
//! detected, never as an error.

mod monitor;
mod report;

use serde::{Deserialize, Serialize};

pub use monitor::{BiasMonitor, BiasWarning};
pub use report::{
    AnchoringAnalysis, BiasEvaluator, BiasReport, ClosureAnalysis, ConfirmationAnalysis,
};

/// The bias patterns the engine can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasType {
    Anchoring,
    Confirmation,
    PrematureClosure,
}

impl BiasType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anchoring => "anchoring",
            Self::Confirmation => "confirmation",
            Self::PrematureClosure => "premature_closure",
        }
    }
}

impl std::fmt::Display for BiasType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Intent groupings used by the real-time heuristics.
///
/// Matching is by containment against the interaction's intent ID, so
/// entries can be full IDs or fragments like `lab_tests`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntentTaxonomy {
    /// Intents that chase the working hypothesis.
    pub confirmatory_intents: Vec<String>,
    /// Intents that broaden the differential.
    pub broader_intents: Vec<String>,
    /// Intents that try to conclude the case.
    pub assessment_intents: Vec<String>,
    /// Fragments identifying information-gathering intents.
    pub info_gathering_markers: Vec<String>,
}

impl Default for IntentTaxonomy {
    fn default() -> Self {
        Self {
            confirmatory_intents: vec![
                "lab_tests".into(),
                "exam_cardiovascular".into(),
                "vital_signs".into(),
            ],
            broader_intents: vec![
                "pmh_general".into(),
                "social_history".into(),
                "family_history".into(),
                "exam_general_appearance".into(),
            ],
            assessment_intents: vec![
                "assessment".into(),
                "treatment".into(),
                "diagnosis".into(),
                "differential".into(),
            ],
            info_gathering_markers: vec![
                "hpi_".into(),
                "pmh_".into(),
                "exam_".into(),
                "lab_".into(),
                "history".into(),
                "imaging_".into(),
            ],
        }
    }
}

impl IntentTaxonomy {
    fn matches(list: &[String], intent_id: &str) -> bool {
        list.iter().any(|entry| intent_id.contains(entry.as_str()))
    }

    #[must_use]
    pub fn is_confirmatory(&self, intent_id: &str) -> bool {
        Self::matches(&self.confirmatory_intents, intent_id)
    }

    #[must_use]
    pub fn is_broader(&self, intent_id: &str) -> bool {
        Self::matches(&self.broader_intents, intent_id)
    }

    #[must_use]
    pub fn is_assessment(&self, intent_id: &str) -> bool {
        Self::matches(&self.assessment_intents, intent_id)
    }

    #[must_use]
    pub fn is_info_gathering(&self, intent_id: &str) -> bool {
        Self::matches(&self.info_gathering_markers, intent_id)
    }
}

/// Tunables for the real-time bias heuristics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    /// Interactions required before any real-time check fires.
    pub min_interactions: usize,
    /// Window of recent interactions examined for anchoring.
    pub anchoring_window: usize,
    /// Window examined for confirmation bias.
    pub confirmation_window: usize,
    /// Window examined for premature closure.
    pub premature_window: usize,
    /// Anchor-match ratio above which anchoring is flagged.
    pub anchoring_ratio: f64,
    /// Confirmatory interactions required to flag confirmation bias.
    pub confirmatory_threshold: usize,
    /// Info-gathering interactions below which assessment is premature.
    pub min_info_interactions: usize,
    pub taxonomy: IntentTaxonomy,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            min_interactions: 3,
            anchoring_window: 5,
            confirmation_window: 7,
            premature_window: 10,
            anchoring_ratio: 0.7,
            confirmatory_threshold: 3,
            min_info_interactions: 5,
            taxonomy: IntentTaxonomy::default(),
        }
    }
}
