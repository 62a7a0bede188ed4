//! Information blocks: the atomic, revealable units of clinical content.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, IntentId};

/// Clinical category of an information block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    History,
    PhysicalExam,
    Labs,
    Imaging,
    Demographics,
    Medications,
}

impl BlockType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "History",
            Self::PhysicalExam => "PhysicalExam",
            Self::Labs => "Labs",
            Self::Imaging => "Imaging",
            Self::Demographics => "Demographics",
            Self::Medications => "Medications",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One atomic, revealable unit of clinical content.
///
/// Blocks are immutable once the case is loaded; per-session revelation state
/// lives in the session store, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationBlock {
    /// Unique identifier within the case.
    pub block_id: BlockId,
    /// Clinical category.
    pub block_type: BlockType,
    /// Opaque clinical text shown to the student when revealed.
    pub content: String,
    /// Whether this block is a critical finding for the case.
    pub is_critical: bool,
    /// Optional group for escalating blocks (revealed level by level).
    pub group_id: Option<String>,
    /// Ordering within the group; 1 is the shallowest level.
    pub level: u32,
    /// Intents that must have been classified at least once in the session
    /// before this block becomes eligible for revelation. The prerequisite
    /// intent need not have revealed anything itself.
    pub prerequisite_intents: BTreeSet<IntentId>,
}

impl InformationBlock {
    /// Whether this block has prerequisite intents gating its revelation.
    #[must_use]
    pub fn is_gated(&self) -> bool {
        !self.prerequisite_intents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_type_round_trips_through_display() {
        for bt in [
            BlockType::History,
            BlockType::PhysicalExam,
            BlockType::Labs,
            BlockType::Imaging,
            BlockType::Demographics,
            BlockType::Medications,
        ] {
            assert!(!bt.as_str().is_empty());
        }
    }

    #[test]
    fn ungated_block_has_no_prerequisites() {
        let block = InformationBlock {
            block_id: BlockId::from("hist_onset"),
            block_type: BlockType::History,
            content: "Symptoms started two weeks ago".to_string(),
            is_critical: false,
            group_id: None,
            level: 1,
            prerequisite_intents: BTreeSet::new(),
        };
        assert!(!block.is_gated());
    }
}
