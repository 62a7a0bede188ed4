//! Compiled, validated case model.
//!
//! A [`Case`] is built once from a [`CaseDocument`] at startup and is
//! read-only afterwards, so it can be shared across sessions without locking.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info};

use crate::bias::{AnchoringTriggers, BiasTriggerConfig, ConfirmationTriggers, GroundTruth};
use crate::block::InformationBlock;
use crate::context::ClinicalContext;
use crate::document::CaseDocument;
use crate::error::{CaseError, Result};
use crate::types::{BlockId, CaseId, IntentId};

/// Intent ID prefixes valid per context when the document does not supply an
/// explicit allow-list.
const ANAMNESIS_PREFIXES: &[&str] = &["hpi_", "pmh_", "meds_", "profile_", "social_", "family_"];
const EXAM_PREFIXES: &[&str] = &["exam_"];
const LABS_PREFIXES: &[&str] = &["labs_", "lab_", "imaging_"];

/// Intents valid in every context: clarification requests and the
/// assessment-phase intents that the bias monitor needs to observe.
const UNIVERSAL_INTENTS: &[&str] =
    &["clarification", "assessment", "diagnosis", "differential", "treatment"];

/// Immutable in-memory representation of one clinical case.
#[derive(Debug, Clone)]
pub struct Case {
    case_id: CaseId,
    blocks: HashMap<BlockId, InformationBlock>,
    /// Ordered list of block IDs a given intent may reveal.
    intent_mappings: BTreeMap<IntentId, Vec<BlockId>>,
    /// Explicit per-context allow-lists; contexts absent here use prefixes.
    context_intents: HashMap<ClinicalContext, BTreeSet<IntentId>>,
    bias_triggers: BiasTriggerConfig,
    ground_truth: GroundTruth,
}

impl Case {
    /// Compile and validate a case document.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError`] if block IDs are duplicated, levels are invalid,
    /// or mappings/triggers/ground truth reference unknown blocks.
    pub fn from_document(doc: CaseDocument) -> Result<Self> {
        let mut blocks = HashMap::with_capacity(doc.information_blocks.len());
        let mut intent_mappings: BTreeMap<IntentId, Vec<BlockId>> = BTreeMap::new();

        for block_doc in doc.information_blocks {
            if block_doc.level < 1 {
                return Err(CaseError::InvalidLevel {
                    block: block_doc.block_id,
                    level: block_doc.level,
                });
            }

            let block = InformationBlock {
                block_id: block_doc.block_id.clone(),
                block_type: block_doc.block_type,
                content: block_doc.content,
                is_critical: block_doc.is_critical,
                group_id: block_doc.group_id,
                level: block_doc.level,
                prerequisite_intents: block_doc.prerequisites,
            };

            for intent in block_doc.intent_triggers {
                let targets = intent_mappings.entry(intent).or_default();
                if !targets.contains(&block.block_id) {
                    targets.push(block.block_id.clone());
                }
            }

            if blocks.contains_key(&block.block_id) {
                return Err(CaseError::DuplicateBlock(block.block_id));
            }
            blocks.insert(block.block_id.clone(), block);
        }

        // Merge explicit mappings on top of block-declared triggers.
        for (intent, targets) in doc.intent_block_mappings {
            let entry = intent_mappings.entry(intent).or_default();
            for target in targets {
                if !entry.contains(&target) {
                    entry.push(target);
                }
            }
        }

        for (intent, targets) in &intent_mappings {
            if targets.is_empty() {
                return Err(CaseError::EmptyMapping(intent.clone()));
            }
            for target in targets {
                if !blocks.contains_key(target) {
                    return Err(CaseError::UnknownBlock {
                        block: target.clone(),
                        referrer: format!("intent mapping '{intent}'"),
                    });
                }
            }
        }

        let bias_triggers = BiasTriggerConfig {
            anchoring: doc.bias_triggers.anchoring.map(|a| AnchoringTriggers {
                anchor_keywords: a.anchor_keywords,
                anchor_intents: a.anchor_intents,
                contradictory_block_id: a.contradictory_info_id,
            }),
            confirmation: doc.bias_triggers.confirmation.map(|c| ConfirmationTriggers {
                supporting_block_ids: c.supporting_info_ids,
                refuting_block_ids: c.refuting_info_ids,
            }),
        };

        if let Some(anchoring) = &bias_triggers.anchoring
            && !blocks.contains_key(&anchoring.contradictory_block_id)
        {
            return Err(CaseError::UnknownBlock {
                block: anchoring.contradictory_block_id.clone(),
                referrer: "anchoring trigger".to_string(),
            });
        }
        if let Some(confirmation) = &bias_triggers.confirmation {
            for id in confirmation
                .supporting_block_ids
                .iter()
                .chain(confirmation.refuting_block_ids.iter())
            {
                if !blocks.contains_key(id) {
                    return Err(CaseError::UnknownBlock {
                        block: id.clone(),
                        referrer: "confirmation trigger".to_string(),
                    });
                }
            }
        }

        let ground_truth = GroundTruth {
            critical_finding_ids: doc.ground_truth.critical_finding_ids,
            final_diagnosis: doc.ground_truth.final_diagnosis,
        };
        for id in &ground_truth.critical_finding_ids {
            if !blocks.contains_key(id) {
                return Err(CaseError::UnknownBlock {
                    block: id.clone(),
                    referrer: "ground truth".to_string(),
                });
            }
        }

        let mut context_intents = HashMap::new();
        for (name, intents) in doc.context_intents {
            if let Ok(context) = name.parse::<ClinicalContext>() {
                context_intents.insert(context, intents);
            } else {
                debug!(context = %name, "ignoring allow-list for unknown context");
            }
        }

        info!(
            case_id = %doc.case_id,
            blocks = blocks.len(),
            intents = intent_mappings.len(),
            critical = ground_truth.critical_finding_ids.len(),
            "case compiled"
        );

        Ok(Self {
            case_id: doc.case_id,
            blocks,
            intent_mappings,
            context_intents,
            bias_triggers,
            ground_truth,
        })
    }

    /// Load and compile a case from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError`] on IO, parse, or validation failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let doc: CaseDocument = serde_json::from_str(&raw)?;
        Self::from_document(doc)
    }

    /// The case identifier.
    #[must_use]
    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    /// Look up a block by ID.
    #[must_use]
    pub fn block(&self, id: &BlockId) -> Option<&InformationBlock> {
        self.blocks.get(id)
    }

    /// All blocks in the case.
    pub fn blocks(&self) -> impl Iterator<Item = &InformationBlock> {
        self.blocks.values()
    }

    /// Total number of information blocks.
    #[must_use]
    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Ordered candidate blocks for an intent. Unmapped intents yield an
    /// empty slice rather than an error.
    #[must_use]
    pub fn candidate_blocks(&self, intent: &IntentId) -> &[BlockId] {
        self.intent_mappings
            .get(intent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether an intent is valid in the given clinical context.
    ///
    /// Uses the document's explicit allow-list when present, otherwise the
    /// built-in prefix rules. Clarification and assessment-phase intents are
    /// valid everywhere.
    #[must_use]
    pub fn intent_valid_for_context(&self, intent: &IntentId, context: ClinicalContext) -> bool {
        if UNIVERSAL_INTENTS.iter().any(|u| intent.as_str() == *u) {
            return true;
        }
        if let Some(allowed) = self.context_intents.get(&context) {
            return allowed.contains(intent);
        }
        let prefixes = match context {
            ClinicalContext::Anamnesis => ANAMNESIS_PREFIXES,
            ClinicalContext::Exam => EXAM_PREFIXES,
            ClinicalContext::Labs => LABS_PREFIXES,
        };
        intent.has_prefix(prefixes)
    }

    /// Bias trigger configuration for this case.
    #[must_use]
    pub fn bias_triggers(&self) -> &BiasTriggerConfig {
        &self.bias_triggers
    }

    /// Ground truth for this case.
    #[must_use]
    pub fn ground_truth(&self) -> &GroundTruth {
        &self.ground_truth
    }
}
