//! The interview engine: one query in, one response out.
//!
//! `InterviewEngine` wires together the session store, the guarded
//! classifier and labeler, the disclosure resolver, the per-context
//! responders, and the bias layers. External calls (classification,
//! labeling) happen outside any session lock; all state mutation is
//! delegated to the store.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use vsp_case::{BlockId, BlockType, Case, ClinicalContext};
use vsp_core::{DiscoveryEvent, Session, SessionHooks, SessionId, SessionStore};

use crate::bias::{BiasEvaluator, BiasMonitor, BiasReport, BiasWarning};
use crate::classify::{
    CLARIFICATION_INTENT, GuardedClassifier, IntentClassification, IntentClassifier,
    KeywordClassifier,
};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::labeler::{DiscoveryLabeler, GuardedLabeler, KeywordLabeler};
use crate::resolver::DisclosureResolver;
use crate::responder::{ClinicalDatum, Responder, ResponderSet};
use crate::stats::{CategorySummary, DiscoveryStats};

/// One labeled revelation surfaced to the student.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub block_id: BlockId,
    pub block_type: BlockType,
    pub content: String,
    pub is_critical: bool,
    pub label: String,
    pub category: String,
    pub summary: String,
    pub confidence: f64,
}

/// Everything produced by one processed query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub session_id: SessionId,
    pub intent: IntentClassification,
    pub context: ClinicalContext,
    pub response: String,
    pub discoveries: Vec<Discovery>,
    pub context_filtered: bool,
    pub warning: Option<BiasWarning>,
    pub stats: DiscoveryStats,
    pub event: DiscoveryEvent,
}

/// Result of submitting the final diagnosis.
#[derive(Debug, Clone)]
pub struct DiagnosisOutcome {
    pub report: BiasReport,
    /// Rendered educational feedback.
    pub feedback: String,
    pub stats: DiscoveryStats,
    pub categories: CategorySummary,
}

/// Builder for [`InterviewEngine`] with swappable collaborators.
pub struct EngineBuilder {
    case: Arc<Case>,
    config: EngineConfig,
    classifier: Option<Arc<dyn IntentClassifier>>,
    labeler: Option<Arc<dyn DiscoveryLabeler>>,
    responders: Option<ResponderSet>,
    hooks: Option<Arc<dyn SessionHooks>>,
    clock: Arc<dyn Clock>,
}

impl EngineBuilder {
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Plug in an external intent classifier (guarded automatically).
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Plug in an external discovery labeler (guarded automatically).
    #[must_use]
    pub fn with_labeler(mut self, labeler: Arc<dyn DiscoveryLabeler>) -> Self {
        self.labeler = Some(labeler);
        self
    }

    #[must_use]
    pub fn with_responders(mut self, responders: ResponderSet) -> Self {
        self.responders = Some(responders);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn build(self) -> InterviewEngine {
        let store = match self.hooks {
            Some(hooks) => Arc::new(SessionStore::new(self.case.clone(), hooks)),
            None => Arc::new(SessionStore::without_hooks(self.case.clone())),
        };
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(KeywordClassifier::new()));
        let labeler = self
            .labeler
            .unwrap_or_else(|| Arc::new(KeywordLabeler::new()));

        InterviewEngine {
            resolver: DisclosureResolver::new(store.clone()),
            classifier: GuardedClassifier::new(
                classifier,
                self.config.classifier.timeout(),
                self.config.classifier.breaker.clone(),
                self.clock.clone(),
            ),
            labeler: GuardedLabeler::new(
                labeler,
                self.config.labeler.timeout(),
                self.config.labeler.breaker.clone(),
                self.clock,
            ),
            responders: self.responders.unwrap_or_default(),
            monitor: BiasMonitor::new(self.config.bias.clone()),
            evaluator: BiasEvaluator::for_case(&self.case),
            store,
        }
    }
}

/// Orchestrates one case's interview sessions.
pub struct InterviewEngine {
    store: Arc<SessionStore>,
    resolver: DisclosureResolver,
    classifier: GuardedClassifier,
    labeler: GuardedLabeler,
    responders: ResponderSet,
    monitor: BiasMonitor,
    evaluator: BiasEvaluator,
}

impl InterviewEngine {
    /// Start building an engine for the given case.
    #[must_use]
    pub fn builder(case: Arc<Case>) -> EngineBuilder {
        EngineBuilder {
            case,
            config: EngineConfig::default(),
            classifier: None,
            labeler: None,
            responders: None,
            hooks: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Engine with keyword collaborators and default config.
    #[must_use]
    pub fn new(case: Arc<Case>) -> Self {
        Self::builder(case).build()
    }

    /// The underlying session store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Process one doctor query.
    ///
    /// Sessions start implicitly on first use. Classification and labeling
    /// are guarded and cannot fail the query; unknown intents degrade to a
    /// clarification exchange.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Session`] only for store-level failures.
    pub async fn process_query(
        &self,
        session_id: &SessionId,
        query: &str,
        context: ClinicalContext,
    ) -> Result<QueryOutcome> {
        self.store.start_session(session_id).await;

        let intent = self.classifier.classify(query, context).await;
        debug!(
            session_id = %session_id,
            intent_id = %intent.intent_id,
            confidence = intent.confidence,
            context = %context,
            "query classified"
        );

        let resolution = self
            .resolver
            .resolve(session_id, &intent.intent_id, query, context)
            .await?;

        let responder = self.responders.for_context(context);

        if resolution.context_filtered {
            // Filtered intents get a redirect line and no interaction record.
            let snapshot = self.snapshot(session_id).await?;
            return Ok(QueryOutcome {
                session_id: session_id.clone(),
                intent,
                context,
                response: responder.context_filtered_line(),
                discoveries: Vec::new(),
                context_filtered: true,
                warning: None,
                stats: DiscoveryStats::from_session(self.store.case(), &snapshot),
                event: resolution.event,
            });
        }

        let mut discoveries = Vec::with_capacity(resolution.revealed.len());
        for block in &resolution.revealed {
            let label = self.labeler.label(block).await;
            // Exam and labs surface the raw finding; anamnesis keeps the
            // labeler's one-line summary.
            let summary = match context {
                ClinicalContext::Exam | ClinicalContext::Labs => block.content.clone(),
                ClinicalContext::Anamnesis => label.summary.clone(),
            };
            discoveries.push(Discovery {
                block_id: block.block_id.clone(),
                block_type: block.block_type,
                content: block.content.clone(),
                is_critical: block.is_critical,
                label: label.label,
                category: label.category,
                summary,
                confidence: label.confidence,
            });
        }

        let response = self.render_response(responder, query, &intent, &discoveries, &resolution);

        self.store
            .record_interaction(
                session_id,
                vsp_core::Interaction {
                    intent_id: intent.intent_id.clone(),
                    user_query: query.to_string(),
                    timestamp: chrono::Utc::now(),
                    discovered_block_ids: discoveries.iter().map(|d| d.block_id.clone()).collect(),
                    confidence: intent.confidence,
                    dialogue_context: context,
                },
            )
            .await?;

        let snapshot = self.snapshot(session_id).await?;
        let warning = self.monitor.check(self.store.case(), &snapshot);
        if let Some(w) = &warning {
            info!(
                session_id = %session_id,
                bias_type = %w.bias_type,
                confidence = w.confidence,
                "real-time bias warning"
            );
        }

        Ok(QueryOutcome {
            session_id: session_id.clone(),
            intent,
            context,
            response,
            discoveries,
            context_filtered: false,
            warning,
            stats: DiscoveryStats::from_session(self.store.case(), &snapshot),
            event: resolution.event,
        })
    }

    fn render_response(
        &self,
        responder: &dyn Responder,
        query: &str,
        intent: &IntentClassification,
        discoveries: &[Discovery],
        resolution: &crate::resolver::Resolution,
    ) -> String {
        if !discoveries.is_empty() {
            let data: Vec<ClinicalDatum> = discoveries
                .iter()
                .map(|d| ClinicalDatum {
                    label: d.label.clone(),
                    summary: d.summary.clone(),
                    content: d.content.clone(),
                })
                .collect();
            return responder.respond(query, &data);
        }
        if intent.intent_id.as_str() == CLARIFICATION_INTENT {
            return responder.clarification_line();
        }
        responder.no_discovery_line(resolution.already_revealed)
    }

    /// Record a working hypothesis.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Session`] for unknown sessions.
    pub async fn add_hypothesis(
        &self,
        session_id: &SessionId,
        diagnosis_text: impl Into<String>,
        reasoning: Option<String>,
    ) -> Result<()> {
        self.store
            .add_hypothesis(session_id, diagnosis_text, reasoning)
            .await?;
        Ok(())
    }

    /// Submit the final diagnosis, completing the session and producing the
    /// bias report and feedback.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Session`] for unknown sessions or a second
    /// submission.
    pub async fn submit_diagnosis(
        &self,
        session_id: &SessionId,
        diagnosis_text: impl Into<String>,
    ) -> Result<DiagnosisOutcome> {
        self.store
            .submit_final_diagnosis(session_id, diagnosis_text)
            .await?;
        let snapshot = self.snapshot(session_id).await?;

        let case = self.store.case();
        let report = self.evaluator.evaluate(case, &snapshot);
        let feedback = self.evaluator.render_feedback(&report);

        Ok(DiagnosisOutcome {
            report,
            feedback,
            stats: DiscoveryStats::from_session(case, &snapshot),
            categories: CategorySummary::from_session(case, &snapshot),
        })
    }

    /// Current discovery statistics for a session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Session`] for unknown sessions.
    pub async fn discovery_stats(&self, session_id: &SessionId) -> Result<DiscoveryStats> {
        let snapshot = self.snapshot(session_id).await?;
        Ok(DiscoveryStats::from_session(self.store.case(), &snapshot))
    }

    /// Per-category summary of revealed vs available information.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Session`] for unknown sessions.
    pub async fn category_summary(&self, session_id: &SessionId) -> Result<CategorySummary> {
        let snapshot = self.snapshot(session_id).await?;
        Ok(CategorySummary::from_session(self.store.case(), &snapshot))
    }

    async fn snapshot(&self, session_id: &SessionId) -> Result<Session> {
        self.store
            .snapshot(session_id)
            .await
            .ok_or_else(|| EngineError::from(vsp_core::SessionError::SessionNotFound(session_id.clone())))
    }
}
