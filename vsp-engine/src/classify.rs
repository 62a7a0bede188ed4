//! Intent classification for doctor queries.
//!
//! The engine talks to classifiers through the [`IntentClassifier`] trait so
//! an external model can be plugged in at the seam. [`KeywordClassifier`] is
//! the deterministic implementation used both standalone and as the fallback
//! behind [`GuardedClassifier`], which wraps any classifier with a timeout and
//! a circuit breaker so external failures never surface to the student.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};
use vsp_case::{ClinicalContext, IntentId};

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::clock::Clock;
use crate::error::ExternalServiceError;

/// Confidence assigned to keyword rule matches.
const KEYWORD_CONFIDENCE: f64 = 0.6;
/// Confidence assigned when no rule matches and we ask for clarification.
const CLARIFICATION_CONFIDENCE: f64 = 0.3;

/// Intent ID returned when a query cannot be classified.
pub const CLARIFICATION_INTENT: &str = "clarification";

/// A classified intent with the classifier's confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentClassification {
    pub intent_id: IntentId,
    pub confidence: f64,
}

impl IntentClassification {
    /// The catch-all classification for unintelligible queries.
    #[must_use]
    pub fn clarification() -> Self {
        Self {
            intent_id: IntentId::from(CLARIFICATION_INTENT),
            confidence: CLARIFICATION_CONFIDENCE,
        }
    }
}

/// Maps a free-text query to a clinical intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        query: &str,
        context: ClinicalContext,
    ) -> Result<IntentClassification, ExternalServiceError>;
}

/// One keyword rule: a compiled pattern and the intent it maps to.
#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    intent: &'static str,
}

impl Rule {
    fn new(pattern: &str, intent: &'static str) -> Option<Self> {
        Regex::new(pattern).ok().map(|pattern| Self { pattern, intent })
    }
}

/// Deterministic keyword classifier.
///
/// Rules are checked in order and the first match wins, so more specific
/// phrasings must precede broader ones within a context. The query's own
/// context is consulted first; queries aimed at another context still
/// classify from that context's table, and the resolver's context filter
/// turns them into a redirect. Unmatched queries classify as clarification
/// with low confidence.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    anamnesis: Vec<Rule>,
    exam: Vec<Rule>,
    labs: Vec<Rule>,
}

impl KeywordClassifier {
    #[must_use]
    pub fn new() -> Self {
        let compile = |table: &[(&str, &'static str)]| {
            table
                .iter()
                .filter_map(|(pattern, intent)| Rule::new(pattern, intent))
                .collect::<Vec<_>>()
        };

        let anamnesis: &[(&str, &'static str)] = &[
            (r"(?i)what brings", "hpi_chief_complaint"),
            (r"(?i)\b(how old|age|elderly|years old)\b", "profile_age"),
            (
                r"(?i)(complete medication|medication reconciliation|hospital records|biologics|infliximab|\btnf\b)",
                "meds_full_reconciliation_query",
            ),
            (r"(?i)\b(arthritis|rheumatoid)\b", "meds_ra_specific_initial_query"),
            (
                r"(?i)\b(medications?|meds|taking|prescriptions?)\b",
                "meds_current_known",
            ),
            (
                r"(?i)\b(when did|start|duration|how long)\b",
                "hpi_onset_duration_primary",
            ),
            (
                r"(?i)(medical history|\bpast\b|\bprevious\b|\bpmh\b)",
                "pmh_general",
            ),
        ];

        let exam: &[(&str, &'static str)] = &[
            (
                r"(?i)\b(blood pressure|vital signs?|vitals|temperature|\bbp\b)\b",
                "exam_vital",
            ),
            (
                r"(?i)\b(heart|cardiovascular|pulse|cardiac)\b",
                "exam_cardiovascular",
            ),
            (
                r"(?i)\b(lungs?|breathing|respiratory|chest sounds)\b",
                "exam_respiratory",
            ),
            (
                r"(?i)\b(examine|physical|check|look at)\b",
                "exam_general_appearance",
            ),
        ];

        let labs: &[(&str, &'static str)] = &[
            (
                r"(?i)(blood work|\bcbc\b|complete blood count)",
                "labs_general",
            ),
            (r"(?i)(chest x-?ray|\bcxr\b)", "imaging_chest_xray"),
            (r"(?i)\b(imaging|radiology|scan)\b", "imaging_general"),
        ];

        Self {
            anamnesis: compile(anamnesis),
            exam: compile(exam),
            labs: compile(labs),
        }
    }

    fn rules(&self, context: ClinicalContext) -> &[Rule] {
        match context {
            ClinicalContext::Anamnesis => &self.anamnesis,
            ClinicalContext::Exam => &self.exam,
            ClinicalContext::Labs => &self.labs,
        }
    }

    /// Infallible classification used directly by the guarded wrapper.
    #[must_use]
    pub fn classify_keywords(&self, query: &str, context: ClinicalContext) -> IntentClassification {
        for rule in self.rules(context) {
            if rule.pattern.is_match(query) {
                return IntentClassification {
                    intent_id: IntentId::from(rule.intent),
                    confidence: KEYWORD_CONFIDENCE,
                };
            }
        }
        // Fall through to the other contexts so misdirected queries classify
        // to their real intent and get context-filtered downstream.
        for other in ClinicalContext::ALL {
            if other == context {
                continue;
            }
            for rule in self.rules(other) {
                if rule.pattern.is_match(query) {
                    return IntentClassification {
                        intent_id: IntentId::from(rule.intent),
                        confidence: KEYWORD_CONFIDENCE,
                    };
                }
            }
        }
        IntentClassification::clarification()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(
        &self,
        query: &str,
        context: ClinicalContext,
    ) -> Result<IntentClassification, ExternalServiceError> {
        Ok(self.classify_keywords(query, context))
    }
}

/// Classifier wrapper that never fails.
///
/// Calls the inner classifier with a deadline; on timeout, error, or an open
/// circuit it falls back to the keyword classifier. Three consecutive failures
/// open the circuit and subsequent calls skip the inner classifier entirely
/// until the cooldown lapses.
pub struct GuardedClassifier {
    inner: Arc<dyn IntentClassifier>,
    fallback: KeywordClassifier,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl GuardedClassifier {
    pub fn new(
        inner: Arc<dyn IntentClassifier>,
        timeout: Duration,
        breaker_config: BreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            fallback: KeywordClassifier::new(),
            breaker: CircuitBreaker::new("classifier", breaker_config, clock),
            timeout,
        }
    }

    pub async fn classify(&self, query: &str, context: ClinicalContext) -> IntentClassification {
        if self.breaker.is_open() {
            debug!(context = %context, "classifier circuit open, using keyword fallback");
            return self.fallback.classify_keywords(query, context);
        }

        match tokio::time::timeout(self.timeout, self.inner.classify(query, context)).await {
            Ok(Ok(classification)) => {
                self.breaker.record_success();
                classification
            }
            Ok(Err(err)) => {
                warn!(error = %err, "classifier call failed, using keyword fallback");
                self.breaker.record_failure();
                self.fallback.classify_keywords(query, context)
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "classifier call timed out, using keyword fallback");
                self.breaker.record_failure();
                self.fallback.classify_keywords(query, context)
            }
        }
    }

    /// Breaker snapshot for observability.
    #[must_use]
    pub fn breaker_state(&self) -> crate::breaker::BreakerState {
        self.breaker.state()
    }
}
