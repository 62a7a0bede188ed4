//! Session store: sole owner of mutable session state.
//!
//! The store holds one entry per session in a concurrent map. Requests for
//! different sessions proceed in parallel; mutations to the same session are
//! serialized by a per-session mutex held only for the duration of the
//! mutation, never across external calls. Persistence hooks fire after the
//! mutation has committed and the lock has been released, so a slow or
//! failing hook can never undo or block a reveal.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use vsp_case::{BlockId, Case};

use crate::error::{Result, SessionError};
use crate::hooks::{NoopHooks, RevealRecord, SessionHooks};
use crate::session::{Hypothesis, Interaction, Session, SessionId, SessionStatus};

/// Result of a reveal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOutcome {
    pub block_id: BlockId,
    /// True when the block was already revealed; the call was a no-op.
    pub already_revealed: bool,
}

/// Owns all sessions for one case.
pub struct SessionStore {
    case: Arc<Case>,
    hooks: Arc<dyn SessionHooks>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Create a store for the given case with persistence hooks.
    pub fn new(case: Arc<Case>, hooks: Arc<dyn SessionHooks>) -> Self {
        Self {
            case,
            hooks,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store with no-op hooks.
    pub fn without_hooks(case: Arc<Case>) -> Self {
        Self::new(case, Arc::new(NoopHooks))
    }

    /// The case this store serves.
    #[must_use]
    pub fn case(&self) -> &Arc<Case> {
        &self.case
    }

    /// Create a session, or return the existing one unchanged.
    ///
    /// Idempotent: starting an already-started session never resets state.
    pub async fn start_session(&self, session_id: &SessionId) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(existing) = sessions.get(session_id) {
                return existing.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; another request may have won.
        if let Some(existing) = sessions.get(session_id) {
            return existing.clone();
        }

        let session = Session::new(
            session_id.clone(),
            self.case.case_id().clone(),
            self.case.blocks().map(|b| b.block_id.clone()),
        );
        let entry = Arc::new(Mutex::new(session));
        sessions.insert(session_id.clone(), entry.clone());
        info!(session_id = %session_id, case_id = %self.case.case_id(), "session started");
        entry
    }

    /// Reveal a block, firing the `on_reveal` hook on first revelation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] or
    /// [`SessionError::BlockNotFound`].
    pub async fn reveal_block(
        &self,
        session_id: &SessionId,
        block_id: &BlockId,
        triggering_query: &str,
    ) -> Result<RevealOutcome> {
        let block = self
            .case
            .block(block_id)
            .ok_or_else(|| SessionError::BlockNotFound(block_id.clone()))?;
        let entry = self.entry(session_id).await?;

        let record = {
            let mut session = entry.lock().await;
            let state = session
                .blocks
                .get_mut(block_id)
                .ok_or_else(|| SessionError::BlockNotFound(block_id.clone()))?;

            if state.is_revealed {
                return Ok(RevealOutcome {
                    block_id: block_id.clone(),
                    already_revealed: true,
                });
            }

            let now = Utc::now();
            state.is_revealed = true;
            state.revealed_at = Some(now);
            state.revealed_by_query = Some(triggering_query.to_string());
            session.revealed_blocks.insert(block_id.clone());

            RevealRecord {
                session_id: session_id.clone(),
                block_id: block_id.clone(),
                block_type: block.block_type,
                is_critical: block.is_critical,
                timestamp: now,
            }
        };

        debug!(session_id = %session_id, block_id = %block_id, critical = block.is_critical, "block revealed");
        self.hooks.on_reveal(&record).await;

        Ok(RevealOutcome {
            block_id: block_id.clone(),
            already_revealed: false,
        })
    }

    /// Append an interaction to the session log.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`].
    pub async fn record_interaction(
        &self,
        session_id: &SessionId,
        interaction: Interaction,
    ) -> Result<()> {
        let entry = self.entry(session_id).await?;
        {
            let mut session = entry.lock().await;
            session.interactions.push(interaction.clone());
        }
        debug!(session_id = %session_id, intent_id = %interaction.intent_id, "interaction recorded");
        self.hooks.on_interaction(session_id, &interaction).await;
        Ok(())
    }

    /// Record a working hypothesis.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`].
    pub async fn add_hypothesis(
        &self,
        session_id: &SessionId,
        diagnosis_text: impl Into<String>,
        reasoning: Option<String>,
    ) -> Result<()> {
        let entry = self.entry(session_id).await?;
        let mut session = entry.lock().await;
        let revealed = session.revealed_blocks.len();
        session.hypotheses.push(Hypothesis {
            diagnosis_text: diagnosis_text.into(),
            reasoning,
            timestamp: Utc::now(),
            revealed_block_count_at_time: revealed,
        });
        Ok(())
    }

    /// Submit the final diagnosis, completing the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] or
    /// [`SessionError::SessionAlreadyCompleted`] on a second submission.
    pub async fn submit_final_diagnosis(
        &self,
        session_id: &SessionId,
        diagnosis_text: impl Into<String>,
    ) -> Result<()> {
        let entry = self.entry(session_id).await?;
        let mut session = entry.lock().await;
        if session.status == SessionStatus::Completed {
            return Err(SessionError::SessionAlreadyCompleted(session_id.clone()));
        }
        session.final_diagnosis = Some(diagnosis_text.into());
        session.status = SessionStatus::Completed;
        info!(session_id = %session_id, "final diagnosis submitted");
        Ok(())
    }

    /// Pure read: clone the current session state, if it exists.
    pub async fn snapshot(&self, session_id: &SessionId) -> Option<Session> {
        let entry = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).cloned()
        }?;
        let session = entry.lock().await;
        Some(session.clone())
    }

    async fn entry(&self, session_id: &SessionId) -> Result<Arc<Mutex<Session>>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(session_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use vsp_case::{CaseDocument, ClinicalContext, IntentId};

    fn case() -> Arc<Case> {
        let json = r#"{
            "caseId": "c1",
            "informationBlocks": [
                { "blockId": "hist_onset", "blockType": "History", "content": "two weeks" },
                { "blockId": "critical_echo", "blockType": "Imaging", "content": "normal EF", "isCritical": true }
            ]
        }"#;
        let doc: CaseDocument = serde_json::from_str(json).unwrap();
        Arc::new(Case::from_document(doc).unwrap())
    }

    fn interaction(intent: &str) -> Interaction {
        Interaction {
            intent_id: IntentId::from(intent),
            user_query: "q".into(),
            timestamp: Utc::now(),
            discovered_block_ids: vec![],
            confidence: 0.9,
            dialogue_context: ClinicalContext::Anamnesis,
        }
    }

    #[tokio::test]
    async fn start_session_is_idempotent() {
        let store = SessionStore::without_hooks(case());
        let id = SessionId::from("s1");
        store.start_session(&id).await;
        store
            .reveal_block(&id, &BlockId::from("hist_onset"), "when did it start?")
            .await
            .unwrap();

        // Starting again must not reset revealed state.
        store.start_session(&id).await;
        let snap = store.snapshot(&id).await.unwrap();
        assert!(snap.is_revealed(&BlockId::from("hist_onset")));
    }

    #[tokio::test]
    async fn reveal_is_monotonic_and_idempotent() {
        let store = SessionStore::without_hooks(case());
        let id = SessionId::from("s1");
        store.start_session(&id).await;

        let first = store
            .reveal_block(&id, &BlockId::from("critical_echo"), "order echo")
            .await
            .unwrap();
        assert!(!first.already_revealed);

        let second = store
            .reveal_block(&id, &BlockId::from("critical_echo"), "order echo again")
            .await
            .unwrap();
        assert!(second.already_revealed);

        let snap = store.snapshot(&id).await.unwrap();
        assert_eq!(snap.revealed_blocks.len(), 1);
        // The original triggering query is preserved.
        assert_eq!(
            snap.blocks[&BlockId::from("critical_echo")]
                .revealed_by_query
                .as_deref(),
            Some("order echo")
        );
    }

    #[tokio::test]
    async fn unknown_session_and_block_are_typed_errors() {
        let store = SessionStore::without_hooks(case());
        let id = SessionId::from("s1");

        let err = store
            .reveal_block(&id, &BlockId::from("hist_onset"), "q")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));

        store.start_session(&id).await;
        let err = store
            .reveal_block(&id, &BlockId::from("nope"), "q")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BlockNotFound(_)));
    }

    #[tokio::test]
    async fn final_diagnosis_is_submitted_at_most_once() {
        let store = SessionStore::without_hooks(case());
        let id = SessionId::from("s1");
        store.start_session(&id).await;

        store
            .submit_final_diagnosis(&id, "heart failure exacerbation")
            .await
            .unwrap();
        let err = store
            .submit_final_diagnosis(&id, "miliary tuberculosis")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionAlreadyCompleted(_)));

        let snap = store.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, SessionStatus::Completed);
        assert_eq!(snap.final_diagnosis.as_deref(), Some("heart failure exacerbation"));
    }

    struct CountingHooks {
        reveals: AtomicUsize,
        interactions: AtomicUsize,
    }

    #[async_trait]
    impl SessionHooks for CountingHooks {
        async fn on_reveal(&self, record: &RevealRecord) {
            assert!(record.timestamp <= Utc::now());
            self.reveals.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_interaction(&self, _session_id: &SessionId, _interaction: &Interaction) {
            self.interactions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn hooks_fire_once_per_first_reveal() {
        let hooks = Arc::new(CountingHooks {
            reveals: AtomicUsize::new(0),
            interactions: AtomicUsize::new(0),
        });
        let store = SessionStore::new(case(), hooks.clone());
        let id = SessionId::from("s1");
        store.start_session(&id).await;

        store
            .reveal_block(&id, &BlockId::from("hist_onset"), "q")
            .await
            .unwrap();
        store
            .reveal_block(&id, &BlockId::from("hist_onset"), "q")
            .await
            .unwrap();
        store.record_interaction(&id, interaction("hpi_cough")).await.unwrap();

        assert_eq!(hooks.reveals.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.interactions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hypotheses_snapshot_revealed_count() {
        let store = SessionStore::without_hooks(case());
        let id = SessionId::from("s1");
        store.start_session(&id).await;

        store.add_hypothesis(&id, "heart failure", None).await.unwrap();
        store
            .reveal_block(&id, &BlockId::from("hist_onset"), "q")
            .await
            .unwrap();
        store.add_hypothesis(&id, "tuberculosis", Some("weight loss".into())).await.unwrap();

        let snap = store.snapshot(&id).await.unwrap();
        assert_eq!(snap.hypotheses[0].revealed_block_count_at_time, 0);
        assert_eq!(snap.hypotheses[1].revealed_block_count_at_time, 1);
    }
}
