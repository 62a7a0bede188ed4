//! Persistence hooks fired by the session store.
//!
//! Hooks are best-effort, fire-and-forget seams for external persistence:
//! they are invoked after the store mutation has committed and have no way to
//! fail it. Implementations that talk to a database should swallow and log
//! their own errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vsp_case::{BlockId, BlockType};

use crate::session::{Interaction, SessionId};

/// Snapshot passed to [`SessionHooks::on_reveal`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealRecord {
    pub session_id: SessionId,
    pub block_id: BlockId,
    pub block_type: BlockType,
    pub is_critical: bool,
    pub timestamp: DateTime<Utc>,
}

/// Save-side hooks invoked by the session store.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Called once per first-time block revelation.
    async fn on_reveal(&self, record: &RevealRecord);

    /// Called once per recorded interaction.
    async fn on_interaction(&self, session_id: &SessionId, interaction: &Interaction);
}

/// Hooks implementation that does nothing.
#[derive(Debug, Default)]
pub struct NoopHooks;

#[async_trait]
impl SessionHooks for NoopHooks {
    async fn on_reveal(&self, _record: &RevealRecord) {}

    async fn on_interaction(&self, _session_id: &SessionId, _interaction: &Interaction) {}
}
