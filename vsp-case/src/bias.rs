//! Bias trigger configuration and case ground truth.
//!
//! Each bias type has its own optional sub-config so "not configured" and
//! "configured but not detected" stay distinguishable at the type level.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, IntentId};

/// Triggers for anchoring bias detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchoringTriggers {
    /// Keywords that identify anchor-aligned hypotheses, queries and the
    /// final diagnosis (matched case-insensitively).
    pub anchor_keywords: Vec<String>,
    /// Intents that count as continued pursuit of the anchor.
    pub anchor_intents: Vec<IntentId>,
    /// The block whose revelation contradicts the anchor hypothesis.
    pub contradictory_block_id: BlockId,
}

/// Triggers for confirmation bias detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationTriggers {
    /// Blocks that support the incorrect working hypothesis.
    pub supporting_block_ids: BTreeSet<BlockId>,
    /// Blocks that refute the incorrect working hypothesis.
    pub refuting_block_ids: BTreeSet<BlockId>,
}

/// Per-case bias trigger configuration. Absent sub-configs disable the
/// corresponding bias type (reported as not detected, never as an error).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiasTriggerConfig {
    pub anchoring: Option<AnchoringTriggers>,
    pub confirmation: Option<ConfirmationTriggers>,
}

/// Case ground truth used for premature closure detection and scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Blocks the student must discover for an adequate workup.
    pub critical_finding_ids: BTreeSet<BlockId>,
    /// The correct final diagnosis.
    pub final_diagnosis: String,
}

impl AnchoringTriggers {
    /// Whether the given free text matches any anchor keyword.
    pub fn matches_text(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.anchor_keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
    }

    /// Whether the given intent is anchor-adjacent.
    pub fn matches_intent(&self, intent: &IntentId) -> bool {
        self.anchor_intents.iter().any(|a| intent.as_str().contains(a.as_str()))
    }
}
