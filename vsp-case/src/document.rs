//! On-disk case document format.
//!
//! The case authoring pipeline produces JSON with camelCase keys; this module
//! mirrors that shape verbatim. Compilation into the validated in-memory
//! [`Case`](crate::case::Case) happens in `case.rs`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::block::BlockType;
use crate::types::{BlockId, CaseId, IntentId};

/// Root of a case document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocument {
    pub case_id: CaseId,
    pub information_blocks: Vec<BlockDocument>,
    /// Explicit intent-to-block mappings. Merged with per-block
    /// `intentTriggers` during compilation.
    #[serde(default)]
    pub intent_block_mappings: BTreeMap<IntentId, Vec<BlockId>>,
    #[serde(default)]
    pub bias_triggers: BiasTriggersDocument,
    #[serde(default)]
    pub ground_truth: GroundTruthDocument,
    /// Optional per-context intent allow-lists. Contexts not listed fall back
    /// to the built-in prefix rules.
    #[serde(default)]
    pub context_intents: BTreeMap<String, BTreeSet<IntentId>>,
}

/// One information block as authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDocument {
    pub block_id: BlockId,
    pub block_type: BlockType,
    pub content: String,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Intents that reveal this block directly.
    #[serde(default)]
    pub intent_triggers: Vec<IntentId>,
    /// Intents that must have been classified before this block is eligible.
    #[serde(default)]
    pub prerequisites: BTreeSet<IntentId>,
}

fn default_level() -> u32 {
    1
}

/// Bias trigger section as authored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasTriggersDocument {
    #[serde(default)]
    pub anchoring: Option<AnchoringDocument>,
    #[serde(default)]
    pub confirmation: Option<ConfirmationDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoringDocument {
    #[serde(default)]
    pub anchor_keywords: Vec<String>,
    #[serde(default)]
    pub anchor_intents: Vec<IntentId>,
    pub contradictory_info_id: BlockId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationDocument {
    #[serde(default)]
    pub supporting_info_ids: BTreeSet<BlockId>,
    #[serde(default)]
    pub refuting_info_ids: BTreeSet<BlockId>,
}

/// Ground truth section as authored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthDocument {
    #[serde(default)]
    pub critical_finding_ids: BTreeSet<BlockId>,
    #[serde(default)]
    pub final_diagnosis: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let json = r#"{
            "caseId": "case_dyspnea_01",
            "informationBlocks": [
                {
                    "blockId": "hist_onset",
                    "blockType": "History",
                    "content": "Symptoms started two weeks ago.",
                    "isCritical": false,
                    "intentTriggers": ["hpi_onset_duration_primary"]
                }
            ]
        }"#;

        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.case_id.as_str(), "case_dyspnea_01");
        assert_eq!(doc.information_blocks.len(), 1);
        assert_eq!(doc.information_blocks[0].level, 1);
        assert!(doc.bias_triggers.anchoring.is_none());
    }

    #[test]
    fn parses_bias_triggers_and_ground_truth() {
        let json = r#"{
            "caseId": "c1",
            "informationBlocks": [],
            "biasTriggers": {
                "anchoring": {
                    "anchorKeywords": ["heart failure"],
                    "contradictoryInfoId": "critical_echo"
                },
                "confirmation": {
                    "supportingInfoIds": ["lab_bnp"],
                    "refutingInfoIds": ["critical_echo"]
                }
            },
            "groundTruth": {
                "criticalFindingIds": ["critical_echo"],
                "finalDiagnosis": "Miliary tuberculosis"
            }
        }"#;

        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        let anchoring = doc.bias_triggers.anchoring.unwrap();
        assert_eq!(anchoring.contradictory_info_id.as_str(), "critical_echo");
        assert_eq!(doc.ground_truth.final_diagnosis, "Miliary tuberculosis");
    }
}
