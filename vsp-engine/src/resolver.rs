//! Progressive disclosure resolution.
//!
//! Given a classified intent, the resolver decides which information blocks
//! to reveal: it filters the intent through the context allow-list, orders
//! the mapped candidates, honors prerequisite intents, and escalates grouped
//! blocks one level per query. Every revelation goes through the session
//! store, so monotonicity and idempotence are inherited from it.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use vsp_case::{ClinicalContext, InformationBlock, IntentId};
use vsp_core::{DiscoveryEvent, SessionError, SessionId, SessionStore};

use crate::error::Result;

/// Outcome of resolving one classified intent.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub event: DiscoveryEvent,
    /// Blocks newly revealed by this query, in reveal order.
    pub revealed: Vec<InformationBlock>,
    /// At least one mapped block had been revealed before this query.
    pub already_revealed: bool,
    pub context_filtered: bool,
}

/// Resolves classified intents into block revelations.
pub struct DisclosureResolver {
    store: Arc<SessionStore>,
}

impl DisclosureResolver {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Resolve an intent against a session.
    ///
    /// Grouped candidates escalate: only the lowest-level unrevealed block of
    /// each group whose prerequisites are met is revealed per query, so
    /// repeated queries walk up the levels. Ungrouped candidates are revealed
    /// together. Prerequisites are satisfied by the session's classified
    /// intent history, the current intent included.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] for unknown sessions.
    pub async fn resolve(
        &self,
        session_id: &SessionId,
        intent: &IntentId,
        query: &str,
        context: ClinicalContext,
    ) -> Result<Resolution> {
        let case = self.store.case().clone();

        if !case.intent_valid_for_context(intent, context) {
            debug!(intent_id = %intent, context = %context, "intent filtered by context");
            return Ok(Resolution {
                event: DiscoveryEvent::filtered(session_id.clone(), intent.clone(), query),
                revealed: Vec::new(),
                already_revealed: false,
                context_filtered: true,
            });
        }

        let snapshot = self
            .store
            .snapshot(session_id)
            .await
            .ok_or_else(|| SessionError::SessionNotFound(session_id.clone()))?;

        let mut candidates: Vec<&InformationBlock> = case
            .candidate_blocks(intent)
            .iter()
            .filter_map(|id| case.block(id))
            .collect();
        candidates.sort_by_key(|b| (b.level, b.block_id.clone()));

        let history: HashSet<&IntentId> = snapshot.intent_history();
        let prerequisites_met = |block: &InformationBlock| {
            block
                .prerequisite_intents
                .iter()
                .all(|p| p == intent || history.contains(p))
        };

        let mut revealed = Vec::new();
        let mut already_revealed = false;
        let mut escalated_groups: HashSet<&str> = HashSet::new();

        for block in candidates {
            if snapshot.is_revealed(&block.block_id) {
                already_revealed = true;
                continue;
            }

            if !prerequisites_met(block) {
                debug!(
                    block_id = %block.block_id,
                    intent_id = %intent,
                    "prerequisites not satisfied, block withheld"
                );
                continue;
            }

            if let Some(group) = block.group_id.as_deref() {
                if !escalated_groups.insert(group) {
                    continue;
                }
            }

            let outcome = self
                .store
                .reveal_block(session_id, &block.block_id, query)
                .await?;
            if outcome.already_revealed {
                already_revealed = true;
            } else {
                revealed.push(block.clone());
            }
        }

        let discovered = revealed.iter().map(|b| b.block_id.clone()).collect();
        Ok(Resolution {
            event: DiscoveryEvent::direct(session_id.clone(), intent.clone(), query, discovered),
            revealed,
            already_revealed,
            context_filtered: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsp_case::{Case, CaseDocument};
    use vsp_core::{Interaction, TriggerType};

    fn case() -> Arc<Case> {
        let json = r#"{
            "caseId": "c1",
            "informationBlocks": [
                {
                    "blockId": "meds_known",
                    "blockType": "Medications",
                    "content": "Lisinopril and metformin.",
                    "groupId": "grp_meds",
                    "level": 1,
                    "intentTriggers": ["meds_current_known"]
                },
                {
                    "blockId": "meds_uncertainty",
                    "blockType": "Medications",
                    "content": "There may be other medications from another clinic.",
                    "groupId": "grp_meds",
                    "level": 2,
                    "intentTriggers": ["meds_current_known", "meds_full_reconciliation_query"]
                },
                {
                    "blockId": "critical_infliximab",
                    "blockType": "Medications",
                    "content": "Records show infliximab infusions.",
                    "isCritical": true,
                    "groupId": "grp_meds",
                    "level": 3,
                    "intentTriggers": ["meds_full_reconciliation_query"],
                    "prerequisites": ["meds_current_known"]
                },
                {
                    "blockId": "exam_heart",
                    "blockType": "PhysicalExam",
                    "content": "Regular rate and rhythm.",
                    "intentTriggers": ["exam_cardiovascular"]
                }
            ]
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        Arc::new(Case::from_document(doc).unwrap())
    }

    async fn store_with_session(id: &SessionId) -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::without_hooks(case()));
        store.start_session(id).await;
        store
    }

    fn interaction(intent: &str, context: ClinicalContext) -> Interaction {
        Interaction {
            intent_id: IntentId::from(intent),
            user_query: "q".into(),
            timestamp: chrono::Utc::now(),
            discovered_block_ids: vec![],
            confidence: 0.9,
            dialogue_context: context,
        }
    }

    #[tokio::test]
    async fn grouped_blocks_escalate_one_level_per_query() {
        let id = SessionId::from("s1");
        let store = store_with_session(&id).await;
        let resolver = DisclosureResolver::new(store.clone());
        let intent = IntentId::from("meds_current_known");

        let first = resolver
            .resolve(&id, &intent, "what is she taking?", ClinicalContext::Anamnesis)
            .await
            .unwrap();
        assert_eq!(first.revealed.len(), 1);
        assert_eq!(first.revealed[0].block_id.as_str(), "meds_known");
        assert_eq!(first.event.trigger_type, TriggerType::Direct);

        let second = resolver
            .resolve(&id, &intent, "anything else?", ClinicalContext::Anamnesis)
            .await
            .unwrap();
        assert_eq!(second.revealed.len(), 1);
        assert_eq!(second.revealed[0].block_id.as_str(), "meds_uncertainty");
        assert!(second.already_revealed);
    }

    #[tokio::test]
    async fn prerequisites_gate_until_intent_was_classified() {
        let id = SessionId::from("s1");
        let store = store_with_session(&id).await;
        let resolver = DisclosureResolver::new(store.clone());
        let recon = IntentId::from("meds_full_reconciliation_query");

        // Without meds_current_known in history, level 3 stays gated;
        // level 2 is revealed instead.
        let first = resolver
            .resolve(&id, &recon, "full reconciliation", ClinicalContext::Anamnesis)
            .await
            .unwrap();
        assert_eq!(first.revealed.len(), 1);
        assert_eq!(first.revealed[0].block_id.as_str(), "meds_uncertainty");

        // Classify the prerequisite intent; no reveal needed.
        store
            .record_interaction(
                &id,
                interaction("meds_current_known", ClinicalContext::Anamnesis),
            )
            .await
            .unwrap();

        let second = resolver
            .resolve(&id, &recon, "check hospital records", ClinicalContext::Anamnesis)
            .await
            .unwrap();
        assert_eq!(second.revealed.len(), 1);
        assert_eq!(second.revealed[0].block_id.as_str(), "critical_infliximab");
    }

    #[tokio::test]
    async fn current_intent_satisfies_its_own_prerequisite() {
        let json = r#"{
            "caseId": "c2",
            "informationBlocks": [
                {
                    "blockId": "hist_travel",
                    "blockType": "History",
                    "content": "Recent travel to an endemic region.",
                    "intentTriggers": ["hpi_travel"],
                    "prerequisites": ["hpi_travel"]
                }
            ]
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        let store = Arc::new(SessionStore::without_hooks(Arc::new(
            Case::from_document(doc).unwrap(),
        )));
        let id = SessionId::from("s1");
        store.start_session(&id).await;
        let resolver = DisclosureResolver::new(store);

        // The prerequisite names the very intent being resolved, so the
        // first query already satisfies it.
        let result = resolver
            .resolve(
                &id,
                &IntentId::from("hpi_travel"),
                "has she traveled recently?",
                ClinicalContext::Anamnesis,
            )
            .await
            .unwrap();
        assert_eq!(result.revealed.len(), 1);
        assert_eq!(result.revealed[0].block_id.as_str(), "hist_travel");
    }

    #[tokio::test]
    async fn context_filtering_reveals_nothing() {
        let id = SessionId::from("s1");
        let store = store_with_session(&id).await;
        let resolver = DisclosureResolver::new(store);

        let result = resolver
            .resolve(
                &id,
                &IntentId::from("exam_cardiovascular"),
                "listen to her heart",
                ClinicalContext::Anamnesis,
            )
            .await
            .unwrap();
        assert!(result.context_filtered);
        assert!(result.revealed.is_empty());
        assert!(result.event.context_filtered);
    }

    #[tokio::test]
    async fn unknown_session_is_an_error() {
        let store = Arc::new(SessionStore::without_hooks(case()));
        let resolver = DisclosureResolver::new(store);
        let err = resolver
            .resolve(
                &SessionId::from("missing"),
                &IntentId::from("meds_current_known"),
                "q",
                ClinicalContext::Anamnesis,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Session(SessionError::SessionNotFound(_))
        ));
    }
}
