//! Discovery labeling for revealed information blocks.
//!
//! Every newly revealed block gets a short human-readable label, a category
//! for the discovery dashboard, and a one-line summary. The
//! [`DiscoveryLabeler`] trait is the seam for an external summarizer;
//! [`KeywordLabeler`] derives everything deterministically from the block
//! itself and doubles as the fallback behind [`GuardedLabeler`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use vsp_case::{BlockType, InformationBlock};

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::clock::Clock;
use crate::error::ExternalServiceError;

const KEYWORD_CONFIDENCE: f64 = 0.6;

/// How a revealed block is presented in the discovery log.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryLabel {
    /// Short display name, e.g. "Echocardiogram".
    pub label: String,
    /// Dashboard category, e.g. "diagnostic_results".
    pub category: String,
    /// One-line description of the finding.
    pub summary: String,
    pub confidence: f64,
}

/// Produces a [`DiscoveryLabel`] for a revealed block.
#[async_trait]
pub trait DiscoveryLabeler: Send + Sync {
    async fn label(&self, block: &InformationBlock)
    -> Result<DiscoveryLabel, ExternalServiceError>;
}

/// Deterministic labeler driven by block type and content keywords.
///
/// Keyword tables map block content (or block ID) fragments to display
/// labels; the first match wins, with a per-type default when nothing
/// matches.
#[derive(Debug, Clone, Default)]
pub struct KeywordLabeler;

impl KeywordLabeler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn type_labels(block_type: BlockType) -> (&'static [(&'static str, &'static str)], &'static str) {
        match block_type {
            BlockType::Demographics => (
                &[
                    ("age", "Patient Age"),
                    ("language", "Language Barrier"),
                    ("records", "Medical Records"),
                    ("social", "Social Context"),
                ],
                "Patient Profile",
            ),
            BlockType::History => (
                &[
                    ("chief", "Chief Complaint"),
                    ("onset", "Onset and Duration"),
                    ("shortness", "Shortness of Breath"),
                    ("dyspnea", "Shortness of Breath"),
                    ("cough", "Cough Symptoms"),
                    ("weight", "Weight Loss"),
                    ("appetite", "Appetite Changes"),
                    ("eating", "Appetite Changes"),
                    ("fever", "Pertinent Negatives"),
                    ("chills", "Pertinent Negatives"),
                    ("pmh", "Past Medical History"),
                ],
                "History Findings",
            ),
            BlockType::Medications => (
                &[
                    ("current", "Current Medications"),
                    ("uncertainty", "Medication Uncertainty"),
                    ("arthritis", "Arthritis Medications"),
                    ("infliximab", "Arthritis Medications"),
                    ("blood_pressure", "Blood Pressure Medications"),
                    ("diabetes", "Diabetes Medications"),
                ],
                "Medications",
            ),
            BlockType::PhysicalExam => (
                &[
                    ("vital", "Vital Signs"),
                    ("general", "General Appearance"),
                    ("cardiac", "Heart Examination"),
                    ("cardiovascular", "Heart Examination"),
                    ("respiratory", "Lung Examination"),
                    ("pulmonary", "Lung Examination"),
                ],
                "Examination Findings",
            ),
            BlockType::Labs => (
                &[
                    ("bnp", "Cardiac Lab Results"),
                    ("wbc", "Blood Results"),
                    ("white", "Blood Results"),
                    ("hemoglobin", "Blood Results"),
                    ("blood", "Blood Results"),
                    ("cbc", "Blood Results"),
                    ("hematocrit", "Blood Results"),
                    ("platelet", "Blood Results"),
                ],
                "Lab Results",
            ),
            BlockType::Imaging => (
                &[
                    ("chest", "Chest X-ray"),
                    ("echo", "Echocardiogram"),
                    ("ct", "CT Scan"),
                ],
                "Other Imaging",
            ),
        }
    }

    /// Dashboard category for a block type.
    #[must_use]
    pub fn category_for(block_type: BlockType) -> &'static str {
        match block_type {
            BlockType::Demographics => "patient_profile",
            BlockType::History => "presenting_symptoms",
            BlockType::Medications => "current_medications",
            BlockType::PhysicalExam => "physical_examination",
            BlockType::Labs => "diagnostic_results",
            BlockType::Imaging => "imaging",
        }
    }

    /// Infallible labeling used directly by the guarded wrapper.
    #[must_use]
    pub fn label_block(&self, block: &InformationBlock) -> DiscoveryLabel {
        let (table, default) = Self::type_labels(block.block_type);
        let content = block.content.to_lowercase();
        let block_id = block.block_id.as_str().to_lowercase();

        let label = table
            .iter()
            .find(|(keyword, _)| content.contains(keyword) || block_id.contains(keyword))
            .map_or(default, |(_, label)| *label);

        DiscoveryLabel {
            label: label.to_string(),
            category: Self::category_for(block.block_type).to_string(),
            summary: format!(
                "{label} information from {}",
                block.block_type.as_str().to_lowercase()
            ),
            confidence: KEYWORD_CONFIDENCE,
        }
    }
}

#[async_trait]
impl DiscoveryLabeler for KeywordLabeler {
    async fn label(
        &self,
        block: &InformationBlock,
    ) -> Result<DiscoveryLabel, ExternalServiceError> {
        Ok(self.label_block(block))
    }
}

/// Labeler wrapper that never fails; mirrors the guarded classifier.
pub struct GuardedLabeler {
    inner: Arc<dyn DiscoveryLabeler>,
    fallback: KeywordLabeler,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl GuardedLabeler {
    pub fn new(
        inner: Arc<dyn DiscoveryLabeler>,
        timeout: Duration,
        breaker_config: BreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            fallback: KeywordLabeler::new(),
            breaker: CircuitBreaker::new("labeler", breaker_config, clock),
            timeout,
        }
    }

    pub async fn label(&self, block: &InformationBlock) -> DiscoveryLabel {
        if self.breaker.is_open() {
            debug!(block_id = %block.block_id, "labeler circuit open, using keyword fallback");
            return self.fallback.label_block(block);
        }

        match tokio::time::timeout(self.timeout, self.inner.label(block)).await {
            Ok(Ok(label)) => {
                self.breaker.record_success();
                label
            }
            Ok(Err(err)) => {
                warn!(error = %err, block_id = %block.block_id, "labeler call failed, using keyword fallback");
                self.breaker.record_failure();
                self.fallback.label_block(block)
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, block_id = %block.block_id, "labeler call timed out, using keyword fallback");
                self.breaker.record_failure();
                self.fallback.label_block(block)
            }
        }
    }
}
