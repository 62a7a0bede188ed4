//! Discovery events emitted by the disclosure resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vsp_case::{BlockId, IntentId};

use crate::session::SessionId;

/// UUIDv7 wrapper for time-ordered event IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new time-ordered event ID using UUIDv7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a discovery was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// The intent mapped directly to at least one newly revealed block.
    Direct,
    /// Nothing new was revealed.
    None,
}

/// The record of blocks newly revealed in response to one classified intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub intent_id: IntentId,
    pub user_query: String,
    pub discovered_block_ids: Vec<BlockId>,
    pub timestamp: DateTime<Utc>,
    pub trigger_type: TriggerType,
    /// Set when the intent was rejected by the context allow-list.
    pub context_filtered: bool,
}

impl DiscoveryEvent {
    /// Build an event for blocks revealed by one resolve call.
    pub fn direct(
        session_id: SessionId,
        intent_id: IntentId,
        user_query: impl Into<String>,
        discovered: Vec<BlockId>,
    ) -> Self {
        let trigger_type = if discovered.is_empty() {
            TriggerType::None
        } else {
            TriggerType::Direct
        };
        Self {
            event_id: EventId::new(),
            session_id,
            intent_id,
            user_query: user_query.into(),
            discovered_block_ids: discovered,
            timestamp: Utc::now(),
            trigger_type,
            context_filtered: false,
        }
    }

    /// Build an event for an intent rejected by context filtering.
    pub fn filtered(session_id: SessionId, intent_id: IntentId, user_query: impl Into<String>) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            intent_id,
            user_query: user_query.into(),
            discovered_block_ids: Vec::new(),
            timestamp: Utc::now(),
            trigger_type: TriggerType::None,
            context_filtered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_type_follows_discovery_contents() {
        let with_blocks = DiscoveryEvent::direct(
            SessionId::from("s"),
            IntentId::from("imaging_echo"),
            "order an echo",
            vec![BlockId::from("critical_echo")],
        );
        assert_eq!(with_blocks.trigger_type, TriggerType::Direct);

        let empty = DiscoveryEvent::direct(
            SessionId::from("s"),
            IntentId::from("imaging_echo"),
            "order an echo",
            vec![],
        );
        assert_eq!(empty.trigger_type, TriggerType::None);
        assert!(!empty.context_filtered);

        let filtered = DiscoveryEvent::filtered(
            SessionId::from("s"),
            IntentId::from("exam_vital"),
            "check vitals",
        );
        assert!(filtered.context_filtered);
    }
}
