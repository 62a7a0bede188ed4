//! End-of-session bias evaluation.
//!
//! Runs once when the final diagnosis is submitted and produces a
//! [`BiasReport`] with one analysis per bias type plus an overall score.
//! Thresholds adapt to case size: the minimum number of information-gathering
//! actions scales with the block count so small teaching cases are not held
//! to the same bar as full workups.

use serde::Serialize;
use tracing::info;
use vsp_case::Case;
use vsp_core::Session;

/// Anchoring analysis: did the initial hypothesis survive contradiction?
#[derive(Debug, Clone, Serialize)]
pub struct AnchoringAnalysis {
    pub detected: bool,
    pub confidence: f64,
    pub reason: String,
    pub initial_hypothesis: Option<String>,
    /// Fraction of post-contradiction interactions still chasing the anchor.
    pub persistence_score: f64,
}

/// Confirmation analysis: supporting vs refuting evidence coverage.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationAnalysis {
    pub detected: bool,
    pub confidence: f64,
    pub reason: String,
    pub support_ratio: f64,
    pub refute_ratio: f64,
    pub supporting_revealed: usize,
    pub refuting_revealed: usize,
}

/// Premature closure analysis: workup depth before concluding.
#[derive(Debug, Clone, Serialize)]
pub struct ClosureAnalysis {
    pub detected: bool,
    pub confidence: f64,
    pub reason: String,
    pub critical_found: usize,
    pub critical_total: usize,
    pub critical_ratio: f64,
    pub info_actions: usize,
}

/// Full end-of-session bias report.
#[derive(Debug, Clone, Serialize)]
pub struct BiasReport {
    pub anchoring: AnchoringAnalysis,
    pub confirmation: ConfirmationAnalysis,
    pub premature_closure: ClosureAnalysis,
    /// Number of bias types detected, 0 to 3.
    pub overall_score: u8,
}

impl BiasReport {
    #[must_use]
    pub fn detected_count(&self) -> u8 {
        [
            self.anchoring.detected,
            self.confirmation.detected,
            self.premature_closure.detected,
        ]
        .iter()
        .filter(|d| **d)
        .count() as u8
    }
}

/// Rule-based session evaluator with case-adaptive thresholds.
#[derive(Debug, Clone)]
pub struct BiasEvaluator {
    /// Minimum revealing interactions for an adequate workup.
    min_actions: usize,
    /// Minimum fraction of critical findings to discover.
    min_critical_ratio: f64,
    /// Post-contradiction interactions needed before persistence counts.
    min_persistence_sample: usize,
}

impl BiasEvaluator {
    /// Build an evaluator with thresholds scaled to the case.
    #[must_use]
    pub fn for_case(case: &Case) -> Self {
        let min_actions = 3.max((0.2 * case.total_blocks() as f64).round() as usize);
        Self {
            min_actions,
            min_critical_ratio: 0.5,
            min_persistence_sample: 2,
        }
    }

    /// Evaluate a completed session.
    #[must_use]
    pub fn evaluate(&self, case: &Case, session: &Session) -> BiasReport {
        let anchoring = self.analyze_anchoring(case, session);
        let confirmation = self.analyze_confirmation(case, session);
        let premature_closure = self.analyze_premature_closure(case, session);

        let mut report = BiasReport {
            anchoring,
            confirmation,
            premature_closure,
            overall_score: 0,
        };
        report.overall_score = report.detected_count();

        info!(
            session_id = %session.session_id,
            overall_score = report.overall_score,
            anchoring = report.anchoring.detected,
            confirmation = report.confirmation.detected,
            premature_closure = report.premature_closure.detected,
            "session bias evaluation complete"
        );
        report
    }

    fn analyze_anchoring(&self, case: &Case, session: &Session) -> AnchoringAnalysis {
        let not_detected = |reason: &str| AnchoringAnalysis {
            detected: false,
            confidence: 0.0,
            reason: reason.to_string(),
            initial_hypothesis: None,
            persistence_score: 0.0,
        };

        let Some(anchoring) = &case.bias_triggers().anchoring else {
            return not_detected("No anchoring triggers defined");
        };
        let Some(initial) = session.hypotheses.first() else {
            return not_detected("No hypotheses recorded");
        };

        let initial_hypothesis = initial.diagnosis_text.trim().to_lowercase();
        if !anchoring.matches_text(&initial_hypothesis) {
            return not_detected("Initial hypothesis doesn't match the expected anchor");
        }

        let contradiction_time = session
            .blocks
            .get(&anchoring.contradictory_block_id)
            .and_then(|state| state.revealed_at);
        let Some(contradiction_time) = contradiction_time else {
            return not_detected("Contradictory evidence not revealed");
        };

        let post: Vec<_> = session
            .interactions
            .iter()
            .filter(|i| i.timestamp > contradiction_time)
            .collect();
        let persistence_score = if post.len() < self.min_persistence_sample {
            0.0
        } else {
            let anchored = post
                .iter()
                .filter(|i| {
                    anchoring.matches_intent(&i.intent_id)
                        || anchoring.matches_text(&i.user_query)
                })
                .count();
            anchored as f64 / post.len() as f64
        };

        let final_matches = session
            .final_diagnosis
            .as_deref()
            .is_some_and(|d| anchoring.matches_text(d));

        if final_matches && persistence_score > 0.5 {
            AnchoringAnalysis {
                detected: true,
                confidence: (0.6 + persistence_score * 0.3).min(0.9),
                reason: "Initial hypothesis persisted despite contradictory evidence"
                    .to_string(),
                initial_hypothesis: Some(initial_hypothesis),
                persistence_score,
            }
        } else if final_matches {
            AnchoringAnalysis {
                detected: true,
                confidence: 0.6,
                reason: "Final diagnosis matches the initial anchor".to_string(),
                initial_hypothesis: Some(initial_hypothesis),
                persistence_score,
            }
        } else {
            AnchoringAnalysis {
                detected: false,
                confidence: 0.0,
                reason: "Final diagnosis differs from the initial anchor or insufficient \
                         persistence"
                    .to_string(),
                initial_hypothesis: Some(initial_hypothesis),
                persistence_score,
            }
        }
    }

    fn analyze_confirmation(&self, case: &Case, session: &Session) -> ConfirmationAnalysis {
        let not_detected = |reason: &str| ConfirmationAnalysis {
            detected: false,
            confidence: 0.0,
            reason: reason.to_string(),
            support_ratio: 0.0,
            refute_ratio: 0.0,
            supporting_revealed: 0,
            refuting_revealed: 0,
        };

        let Some(confirmation) = &case.bias_triggers().confirmation else {
            return not_detected("No confirmation bias triggers defined");
        };
        if confirmation.supporting_block_ids.is_empty()
            || confirmation.refuting_block_ids.is_empty()
        {
            return not_detected("Insufficient bias trigger data");
        }

        let supporting_revealed = confirmation
            .supporting_block_ids
            .intersection(&session.revealed_blocks)
            .count();
        let refuting_revealed = confirmation
            .refuting_block_ids
            .intersection(&session.revealed_blocks)
            .count();

        let support_ratio =
            supporting_revealed as f64 / confirmation.supporting_block_ids.len() as f64;
        let refute_ratio =
            refuting_revealed as f64 / confirmation.refuting_block_ids.len() as f64;

        if support_ratio >= 0.5 && refute_ratio < 0.3 {
            ConfirmationAnalysis {
                detected: true,
                confidence: 0.8,
                reason: "Disproportionate focus on confirming evidence while avoiding \
                         contradictory evidence"
                    .to_string(),
                support_ratio,
                refute_ratio,
                supporting_revealed,
                refuting_revealed,
            }
        } else {
            ConfirmationAnalysis {
                detected: false,
                confidence: 0.0,
                reason: format!(
                    "Balanced information gathering (support: {:.0}%, refute: {:.0}%)",
                    support_ratio * 100.0,
                    refute_ratio * 100.0
                ),
                support_ratio,
                refute_ratio,
                supporting_revealed,
                refuting_revealed,
            }
        }
    }

    fn analyze_premature_closure(&self, case: &Case, session: &Session) -> ClosureAnalysis {
        let critical = &case.ground_truth().critical_finding_ids;
        if critical.is_empty() {
            return ClosureAnalysis {
                detected: false,
                confidence: 0.0,
                reason: "No critical findings defined in case".to_string(),
                critical_found: 0,
                critical_total: 0,
                critical_ratio: 0.0,
                info_actions: session.info_gathering_count(),
            };
        }

        let critical_found = critical.intersection(&session.revealed_blocks).count();
        let critical_ratio = critical_found as f64 / critical.len() as f64;
        let info_actions = session.info_gathering_count();

        let too_few_critical = critical_ratio < self.min_critical_ratio;
        let too_few_actions = info_actions < self.min_actions;

        let (detected, confidence, reason) = match (too_few_critical, too_few_actions) {
            (true, true) => (
                true,
                0.9,
                "Insufficient information gathering before reaching conclusion".to_string(),
            ),
            (true, false) => (
                true,
                0.6,
                "Missed critical findings suggesting incomplete investigation".to_string(),
            ),
            (false, true) => (
                true,
                0.7,
                "Very limited information gathering before conclusion".to_string(),
            ),
            (false, false) => (
                false,
                0.0,
                format!(
                    "Adequate investigation (critical: {:.0}%, actions: {info_actions})",
                    critical_ratio * 100.0
                ),
            ),
        };

        ClosureAnalysis {
            detected,
            confidence,
            reason,
            critical_found,
            critical_total: critical.len(),
            critical_ratio,
            info_actions,
        }
    }

    /// Render the educational feedback text for a report.
    #[must_use]
    pub fn render_feedback(&self, report: &BiasReport) -> String {
        let mut sections = Vec::new();

        sections.push(match report.overall_score {
            0 => "Excellent! No significant cognitive biases were detected in your clinical \
                  reasoning."
                .to_string(),
            1 => "One cognitive bias pattern was detected. Review the analysis below to \
                  improve your clinical reasoning."
                .to_string(),
            n => format!(
                "Multiple cognitive bias patterns were detected ({n}). This suggests \
                 significant room for improvement in clinical reasoning."
            ),
        });

        if report.anchoring.detected {
            let hypothesis = report
                .anchoring
                .initial_hypothesis
                .as_deref()
                .unwrap_or("your initial impression");
            sections.push(format!(
                "Anchoring bias: you initially focused on \"{hypothesis}\" and maintained \
                 this diagnosis even after contradictory evidence was revealed. When new \
                 information contradicts your hypothesis, actively reconsider your \
                 differential. Ask yourself: what else could explain these findings?"
            ));
        }

        if report.confirmation.detected {
            sections.push(format!(
                "Confirmation bias: you revealed {} pieces of supporting evidence but only \
                 {} pieces of contradictory evidence (support {:.0}%, refute {:.0}%). \
                 Actively seek information that could disprove your working diagnosis.",
                report.confirmation.supporting_revealed,
                report.confirmation.refuting_revealed,
                report.confirmation.support_ratio * 100.0,
                report.confirmation.refute_ratio * 100.0,
            ));
        }

        if report.premature_closure.detected {
            sections.push(format!(
                "Premature closure: you found {:.0}% of critical findings and performed {} \
                 information-gathering actions before concluding. Ensure a systematic review \
                 of history, examination, and appropriate tests before finalizing a \
                 diagnosis.",
                report.premature_closure.critical_ratio * 100.0,
                report.premature_closure.info_actions,
            ));
        }

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use vsp_case::{BlockId, CaseDocument, CaseId, ClinicalContext, IntentId};
    use vsp_core::{Interaction, SessionId, SessionStatus};

    fn case() -> Case {
        let json = r#"{
            "caseId": "c1",
            "informationBlocks": [
                { "blockId": "pe_resp", "blockType": "PhysicalExam", "content": "Crackles." },
                { "blockId": "lab_bnp", "blockType": "Labs", "content": "BNP elevated." },
                { "blockId": "hist_weight_loss", "blockType": "History", "content": "Weight loss.", "isCritical": true },
                { "blockId": "critical_echo", "blockType": "Imaging", "content": "Preserved EF.", "isCritical": true },
                { "blockId": "critical_infliximab", "blockType": "Medications", "content": "On infliximab.", "isCritical": true },
                { "blockId": "critical_ct", "blockType": "Imaging", "content": "Miliary pattern.", "isCritical": true }
            ],
            "biasTriggers": {
                "anchoring": {
                    "anchorKeywords": ["heart failure", "cardiac", "chf"],
                    "anchorIntents": ["exam_cardiovascular", "lab_tests_cardiac"],
                    "contradictoryInfoId": "critical_echo"
                },
                "confirmation": {
                    "supportingInfoIds": ["pe_resp", "lab_bnp"],
                    "refutingInfoIds": ["hist_weight_loss", "critical_echo", "critical_infliximab", "critical_ct"]
                }
            },
            "groundTruth": {
                "criticalFindingIds": ["hist_weight_loss", "critical_echo", "critical_infliximab", "critical_ct"],
                "finalDiagnosis": "Miliary tuberculosis"
            }
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        Case::from_document(doc).unwrap()
    }

    fn base_session(case: &Case) -> Session {
        Session::new(
            SessionId::from("s1"),
            CaseId::from("c1"),
            case.blocks().map(|b| b.block_id.clone()),
        )
    }

    fn reveal(session: &mut Session, id: &str, at: chrono::DateTime<Utc>) {
        let block_id = BlockId::from(id);
        if let Some(state) = session.blocks.get_mut(&block_id) {
            state.is_revealed = true;
            state.revealed_at = Some(at);
        }
        session.revealed_blocks.insert(block_id);
    }

    fn interact(session: &mut Session, intent: &str, query: &str, at: chrono::DateTime<Utc>, discovered: &[&str]) {
        session.interactions.push(Interaction {
            intent_id: IntentId::from(intent),
            user_query: query.to_string(),
            timestamp: at,
            discovered_block_ids: discovered.iter().map(|d| BlockId::from(*d)).collect(),
            confidence: 0.8,
            dialogue_context: ClinicalContext::Anamnesis,
        });
    }

    #[test]
    fn anchored_session_scores_all_three_biases() {
        let case = case();
        let evaluator = BiasEvaluator::for_case(&case);
        let mut session = base_session(&case);
        let t0 = Utc::now();

        session.hypotheses.push(vsp_core::Hypothesis {
            diagnosis_text: "Heart failure exacerbation".into(),
            reasoning: None,
            timestamp: t0,
            revealed_block_count_at_time: 0,
        });
        reveal(&mut session, "pe_resp", t0 + Duration::minutes(1));
        reveal(&mut session, "lab_bnp", t0 + Duration::minutes(2));
        reveal(&mut session, "critical_echo", t0 + Duration::minutes(3));
        interact(&mut session, "exam_cardiovascular", "heart sounds?", t0 + Duration::minutes(4), &[]);
        interact(&mut session, "lab_tests_cardiac", "repeat bnp", t0 + Duration::minutes(5), &[]);
        session.final_diagnosis = Some("Heart failure exacerbation".into());
        session.status = SessionStatus::Completed;

        let report = evaluator.evaluate(&case, &session);

        assert!(report.anchoring.detected);
        assert!(report.anchoring.persistence_score > 0.5);
        assert!(report.anchoring.confidence > 0.8);

        // support 2/2 = 1.0, refute 1/4 = 0.25
        assert!(report.confirmation.detected);
        assert!((report.confirmation.support_ratio - 1.0).abs() < f64::EPSILON);
        assert!((report.confirmation.refute_ratio - 0.25).abs() < f64::EPSILON);

        // 1/4 critical, 0 revealing interactions
        assert!(report.premature_closure.detected);
        assert!((report.premature_closure.confidence - 0.9).abs() < f64::EPSILON);

        assert_eq!(report.overall_score, 3);
        let feedback = evaluator.render_feedback(&report);
        assert!(feedback.contains("Multiple cognitive bias patterns"));
        assert!(feedback.contains("heart failure exacerbation"));
    }

    #[test]
    fn moderate_anchoring_without_persistence() {
        let case = case();
        let evaluator = BiasEvaluator::for_case(&case);
        let mut session = base_session(&case);
        let t0 = Utc::now();

        session.hypotheses.push(vsp_core::Hypothesis {
            diagnosis_text: "CHF".into(),
            reasoning: None,
            timestamp: t0,
            revealed_block_count_at_time: 0,
        });
        reveal(&mut session, "critical_echo", t0 + Duration::minutes(1));
        // Broad exploration after the contradiction.
        interact(&mut session, "pmh_general", "past history?", t0 + Duration::minutes(2), &[]);
        interact(&mut session, "hpi_weight", "weight changes?", t0 + Duration::minutes(3), &[]);
        interact(&mut session, "meds_current_known", "medications?", t0 + Duration::minutes(4), &[]);
        session.final_diagnosis = Some("heart failure".into());

        let report = evaluator.evaluate(&case, &session);
        assert!(report.anchoring.detected);
        assert!((report.anchoring.confidence - 0.6).abs() < f64::EPSILON);
        assert!(report.anchoring.persistence_score < 0.5);
    }

    #[test]
    fn thorough_session_is_clean() {
        let case = case();
        let evaluator = BiasEvaluator::for_case(&case);
        let mut session = base_session(&case);
        let t0 = Utc::now();

        session.hypotheses.push(vsp_core::Hypothesis {
            diagnosis_text: "Possible tuberculosis".into(),
            reasoning: Some("weight loss and immunosuppression".into()),
            timestamp: t0,
            revealed_block_count_at_time: 0,
        });
        for (i, id) in [
            "pe_resp",
            "lab_bnp",
            "hist_weight_loss",
            "critical_echo",
            "critical_infliximab",
            "critical_ct",
        ]
        .iter()
        .enumerate()
        {
            let at = t0 + Duration::minutes(i as i64 + 1);
            reveal(&mut session, id, at);
            interact(&mut session, "hpi_general", "tell me more", at, &[id]);
        }
        session.final_diagnosis = Some("Miliary tuberculosis".into());
        session.status = SessionStatus::Completed;

        let report = evaluator.evaluate(&case, &session);
        assert_eq!(report.overall_score, 0);
        assert!(!report.anchoring.detected);
        assert!(!report.confirmation.detected);
        assert!(!report.premature_closure.detected);
        let feedback = evaluator.render_feedback(&report);
        assert!(feedback.contains("No significant cognitive biases"));
    }

    #[test]
    fn missing_triggers_disable_detection() {
        let json = r#"{
            "caseId": "c2",
            "informationBlocks": [
                { "blockId": "b1", "blockType": "History", "content": "x" }
            ]
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        let case = Case::from_document(doc).unwrap();
        let evaluator = BiasEvaluator::for_case(&case);
        let session = base_session(&case);

        let report = evaluator.evaluate(&case, &session);
        assert_eq!(report.overall_score, 0);
        assert_eq!(report.anchoring.reason, "No anchoring triggers defined");
        assert_eq!(
            report.confirmation.reason,
            "No confirmation bias triggers defined"
        );
        assert_eq!(
            report.premature_closure.reason,
            "No critical findings defined in case"
        );
    }
}
