//! Session discovery statistics.
//!
//! Pure functions over a session snapshot and its case; used for the
//! per-query progress readout and the end-of-session summary.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use vsp_case::Case;
use vsp_core::Session;

use crate::labeler::KeywordLabeler;

/// Progress counters for one session.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryStats {
    pub total_blocks: usize,
    pub revealed_blocks: usize,
    /// Percentage of blocks revealed, 0.0 to 100.0.
    pub discovery_percentage: f64,
    pub critical_total: usize,
    pub critical_revealed: usize,
    pub total_interactions: usize,
    pub session_duration_minutes: f64,
}

impl DiscoveryStats {
    #[must_use]
    pub fn from_session(case: &Case, session: &Session) -> Self {
        let total_blocks = case.total_blocks();
        let revealed_blocks = session.revealed_blocks.len();
        let critical = &case.ground_truth().critical_finding_ids;
        let critical_revealed = critical.intersection(&session.revealed_blocks).count();

        Self {
            total_blocks,
            revealed_blocks,
            discovery_percentage: if total_blocks > 0 {
                revealed_blocks as f64 / total_blocks as f64 * 100.0
            } else {
                0.0
            },
            critical_total: critical.len(),
            critical_revealed,
            total_interactions: session.interactions.len(),
            session_duration_minutes: (Utc::now() - session.start_time).num_seconds() as f64
                / 60.0,
        }
    }
}

/// Revealed vs available counts for one discovery category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryBreakdown {
    pub total: usize,
    pub revealed: usize,
    pub critical_total: usize,
    pub critical_revealed: usize,
}

/// Per-category summary of what the session has uncovered.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub categories: BTreeMap<String, CategoryBreakdown>,
    pub total_blocks: usize,
    pub total_revealed: usize,
}

impl CategorySummary {
    #[must_use]
    pub fn from_session(case: &Case, session: &Session) -> Self {
        let mut categories: BTreeMap<String, CategoryBreakdown> = BTreeMap::new();

        for block in case.blocks() {
            let entry = categories
                .entry(KeywordLabeler::category_for(block.block_type).to_string())
                .or_default();
            entry.total += 1;
            if block.is_critical {
                entry.critical_total += 1;
            }
            if session.is_revealed(&block.block_id) {
                entry.revealed += 1;
                if block.is_critical {
                    entry.critical_revealed += 1;
                }
            }
        }

        Self {
            categories,
            total_blocks: case.total_blocks(),
            total_revealed: session.revealed_blocks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsp_case::{BlockId, CaseDocument, CaseId};
    use vsp_core::SessionId;

    fn case() -> Case {
        let json = r#"{
            "caseId": "c1",
            "informationBlocks": [
                { "blockId": "hist_a", "blockType": "History", "content": "a" },
                { "blockId": "hist_b", "blockType": "History", "content": "b", "isCritical": true },
                { "blockId": "labs_a", "blockType": "Labs", "content": "c" }
            ],
            "groundTruth": { "criticalFindingIds": ["hist_b"], "finalDiagnosis": "x" }
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        Case::from_document(doc).unwrap()
    }

    #[test]
    fn stats_and_categories_track_reveals() {
        let case = case();
        let mut session = Session::new(
            SessionId::from("s1"),
            CaseId::from("c1"),
            case.blocks().map(|b| b.block_id.clone()),
        );
        session.revealed_blocks.insert(BlockId::from("hist_b"));

        let stats = DiscoveryStats::from_session(&case, &session);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.revealed_blocks, 1);
        assert_eq!(stats.critical_revealed, 1);
        assert!((stats.discovery_percentage - 100.0 / 3.0).abs() < 1e-9);

        let summary = CategorySummary::from_session(&case, &session);
        let history = &summary.categories["presenting_symptoms"];
        assert_eq!(history.total, 2);
        assert_eq!(history.revealed, 1);
        assert_eq!(history.critical_revealed, 1);
        let labs = &summary.categories["diagnostic_results"];
        assert_eq!(labs.total, 1);
        assert_eq!(labs.revealed, 0);
    }
}
