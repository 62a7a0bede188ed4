//! Real-time bias heuristics.
//!
//! The monitor looks at a sliding window of recent interactions after each
//! query and returns at most one warning, checked in priority order:
//! anchoring, confirmation, premature closure. Warnings are advisory; they
//! never block the interview.

use serde::Serialize;
use tracing::debug;
use vsp_case::Case;
use vsp_core::Session;

use super::{BiasConfig, BiasType};

/// Immediate feedback emitted mid-session.
#[derive(Debug, Clone, Serialize)]
pub struct BiasWarning {
    pub bias_type: BiasType,
    pub confidence: f64,
    /// Message shown to the student.
    pub message: String,
    /// Short diagnostic string for logs and research export.
    pub details: String,
}

/// Sliding-window bias detector run after every recorded interaction.
#[derive(Debug, Clone, Default)]
pub struct BiasMonitor {
    config: BiasConfig,
}

impl BiasMonitor {
    #[must_use]
    pub fn new(config: BiasConfig) -> Self {
        Self { config }
    }

    /// Check the session for bias patterns, returning the highest-priority
    /// warning if any fires.
    #[must_use]
    pub fn check(&self, case: &Case, session: &Session) -> Option<BiasWarning> {
        if session.interactions.len() < self.config.min_interactions {
            debug!(
                interactions = session.interactions.len(),
                "too few interactions for bias detection"
            );
            return None;
        }

        self.check_anchoring(case, session)
            .or_else(|| self.check_confirmation(case, session))
            .or_else(|| self.check_premature_closure(session))
    }

    fn check_anchoring(&self, case: &Case, session: &Session) -> Option<BiasWarning> {
        let Some(anchoring) = &case.bias_triggers().anchoring else {
            debug!("no anchoring trigger configured");
            return None;
        };

        let recent = tail(&session.interactions, self.config.anchoring_window);
        if recent.is_empty() {
            return None;
        }

        let mut anchor_hits = 0usize;
        for interaction in recent {
            if anchoring.matches_text(&interaction.user_query) {
                anchor_hits += 1;
            }
            if anchoring.matches_intent(&interaction.intent_id) {
                anchor_hits += 1;
            }
        }

        let ratio = anchor_hits as f64 / recent.len() as f64;
        if ratio > self.config.anchoring_ratio {
            return Some(BiasWarning {
                bias_type: BiasType::Anchoring,
                confidence: 0.8,
                message: "You seem focused on a single diagnosis. Consider other conditions \
                          that could explain these findings."
                    .to_string(),
                details: format!(
                    "Anchor focus in {anchor_hits}/{} recent interactions",
                    recent.len()
                ),
            });
        }
        None
    }

    fn check_confirmation(&self, case: &Case, session: &Session) -> Option<BiasWarning> {
        if case.bias_triggers().confirmation.is_none() {
            debug!("no confirmation trigger configured");
            return None;
        }

        let taxonomy = &self.config.taxonomy;
        let recent = tail(&session.interactions, self.config.confirmation_window);

        let confirmatory = recent
            .iter()
            .filter(|i| taxonomy.is_confirmatory(i.intent_id.as_str()))
            .count();
        let broader = recent
            .iter()
            .filter(|i| taxonomy.is_broader(i.intent_id.as_str()))
            .count();

        if confirmatory >= self.config.confirmatory_threshold && broader == 0 {
            return Some(BiasWarning {
                bias_type: BiasType::Confirmation,
                confidence: 0.7,
                message: "Consider exploring other aspects: social history, past medical \
                          history, or alternative diagnoses."
                    .to_string(),
                details: format!("Confirmatory: {confirmatory}, Broader: {broader}"),
            });
        }
        None
    }

    fn check_premature_closure(&self, session: &Session) -> Option<BiasWarning> {
        let taxonomy = &self.config.taxonomy;
        let recent = tail(&session.interactions, self.config.premature_window);

        let assessment = recent
            .iter()
            .filter(|i| taxonomy.is_assessment(i.intent_id.as_str()))
            .count();
        let info_gathering = recent
            .iter()
            .filter(|i| taxonomy.is_info_gathering(i.intent_id.as_str()))
            .count();

        if assessment > 0 && info_gathering < self.config.min_info_interactions {
            return Some(BiasWarning {
                bias_type: BiasType::PrematureClosure,
                confidence: 0.6,
                message: "Consider gathering more information before reaching conclusions."
                    .to_string(),
                details: format!(
                    "Assessment attempts: {assessment}, Info gathering: {info_gathering}"
                ),
            });
        }
        None
    }
}

fn tail<T>(items: &[T], window: usize) -> &[T] {
    let start = items.len().saturating_sub(window);
    &items[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vsp_case::{BlockId, CaseDocument, CaseId, ClinicalContext, IntentId};
    use vsp_core::{Interaction, SessionId};

    fn case_with_triggers() -> Case {
        let json = r#"{
            "caseId": "c1",
            "informationBlocks": [
                { "blockId": "critical_echo", "blockType": "Imaging", "content": "Preserved EF." },
                { "blockId": "lab_bnp", "blockType": "Labs", "content": "BNP mildly elevated." },
                { "blockId": "hist_weight_loss", "blockType": "History", "content": "Weight loss." }
            ],
            "biasTriggers": {
                "anchoring": {
                    "anchorKeywords": ["heart failure", "cardiac", "chf"],
                    "anchorIntents": ["exam_cardiovascular"],
                    "contradictoryInfoId": "critical_echo"
                },
                "confirmation": {
                    "supportingInfoIds": ["lab_bnp"],
                    "refutingInfoIds": ["hist_weight_loss", "critical_echo"]
                }
            }
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        Case::from_document(doc).unwrap()
    }

    fn session_with(intents: &[(&str, &str)]) -> Session {
        let mut session = Session::new(
            SessionId::from("s1"),
            CaseId::from("c1"),
            std::iter::empty::<BlockId>(),
        );
        for (intent, query) in intents {
            session.interactions.push(Interaction {
                intent_id: IntentId::from(*intent),
                user_query: (*query).to_string(),
                timestamp: Utc::now(),
                discovered_block_ids: vec![],
                confidence: 0.8,
                dialogue_context: ClinicalContext::Anamnesis,
            });
        }
        session
    }

    #[test]
    fn too_few_interactions_yields_nothing() {
        let case = case_with_triggers();
        let session = session_with(&[("assessment", "it's heart failure")]);
        let monitor = BiasMonitor::default();
        assert!(monitor.check(&case, &session).is_none());
    }

    #[test]
    fn sustained_anchor_focus_is_flagged() {
        let case = case_with_triggers();
        let session = session_with(&[
            ("exam_cardiovascular", "listen to the heart"),
            ("exam_cardiovascular", "any cardiac murmurs?"),
            ("labs_general", "is this heart failure?"),
            ("imaging_chest_xray", "signs of chf on the film?"),
        ]);
        let monitor = BiasMonitor::default();
        let warning = monitor.check(&case, &session).expect("anchoring warning");
        assert_eq!(warning.bias_type, BiasType::Anchoring);
        assert!((warning.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn confirmatory_streak_without_breadth_is_flagged() {
        let case = case_with_triggers();
        let session = session_with(&[
            ("lab_tests_cardiac", "bnp level?"),
            ("vital_signs", "vitals?"),
            ("lab_tests_repeat", "repeat the panel"),
        ]);
        let monitor = BiasMonitor::default();
        let warning = monitor.check(&case, &session).expect("confirmation warning");
        assert_eq!(warning.bias_type, BiasType::Confirmation);
    }

    #[test]
    fn broader_exploration_suppresses_confirmation_warning() {
        let case = case_with_triggers();
        let session = session_with(&[
            ("lab_tests_cardiac", "bnp level?"),
            ("vital_signs", "vitals?"),
            ("lab_tests_repeat", "repeat the panel"),
            ("pmh_general", "past medical history?"),
            ("hpi_onset_duration_primary", "when did it start?"),
            ("hpi_weight", "any weight changes?"),
            ("hpi_appetite", "how is her appetite?"),
        ]);
        let monitor = BiasMonitor::default();
        assert!(monitor.check(&case, &session).is_none());
    }

    #[test]
    fn early_assessment_triggers_premature_closure() {
        let case = case_with_triggers();
        let session = session_with(&[
            ("hpi_chief_complaint", "what brings her in?"),
            ("profile_age", "how old is she?"),
            ("assessment", "I think we can wrap this up"),
        ]);
        let monitor = BiasMonitor::default();
        let warning = monitor.check(&case, &session).expect("closure warning");
        assert_eq!(warning.bias_type, BiasType::PrematureClosure);
        assert!((warning.confidence - 0.6).abs() < f64::EPSILON);
    }
}
