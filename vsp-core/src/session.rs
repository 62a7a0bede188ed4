//! Session state for one progressive disclosure interview.
//!
//! All mutation goes through the [`SessionStore`](crate::store::SessionStore);
//! the types here are plain data. `Session` is cheap enough to clone that the
//! bias evaluator works on snapshots rather than holding locks.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vsp_case::{BlockId, CaseId, ClinicalContext, IntentId};

/// String wrapper for session identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting queries.
    Active,
    /// A final diagnosis was submitted; no further mutation allowed.
    Completed,
}

/// Per-session revelation state of one information block.
///
/// `is_revealed` only ever transitions false to true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockState {
    pub is_revealed: bool,
    pub revealed_at: Option<DateTime<Utc>>,
    pub revealed_by_query: Option<String>,
}

/// One logged exchange between the student and the system. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub intent_id: IntentId,
    pub user_query: String,
    pub timestamp: DateTime<Utc>,
    /// Blocks newly revealed by this interaction (possibly empty).
    pub discovered_block_ids: Vec<BlockId>,
    /// Classifier confidence for the intent.
    pub confidence: f64,
    /// The clinical context the query was asked in.
    pub dialogue_context: ClinicalContext,
}

impl Interaction {
    /// Whether this interaction revealed any information.
    #[must_use]
    pub fn revealed_anything(&self) -> bool {
        !self.discovered_block_ids.is_empty()
    }
}

/// A working hypothesis recorded by the student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub diagnosis_text: String,
    pub reasoning: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// How many blocks had been revealed when the hypothesis was added.
    pub revealed_block_count_at_time: usize,
}

/// State of one progressive disclosure session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub case_id: CaseId,
    pub start_time: DateTime<Utc>,
    pub blocks: HashMap<BlockId, BlockState>,
    /// Derived from `blocks`; monotonically non-decreasing.
    pub revealed_blocks: BTreeSet<BlockId>,
    pub interactions: Vec<Interaction>,
    pub hypotheses: Vec<Hypothesis>,
    pub final_diagnosis: Option<String>,
    pub status: SessionStatus,
}

impl Session {
    /// Create a fresh session with every case block unrevealed.
    pub fn new(session_id: SessionId, case_id: CaseId, block_ids: impl IntoIterator<Item = BlockId>) -> Self {
        let blocks = block_ids
            .into_iter()
            .map(|id| (id, BlockState::default()))
            .collect();
        Self {
            session_id,
            case_id,
            start_time: Utc::now(),
            blocks,
            revealed_blocks: BTreeSet::new(),
            interactions: Vec::new(),
            hypotheses: Vec::new(),
            final_diagnosis: None,
            status: SessionStatus::Active,
        }
    }

    /// Whether the given block has been revealed in this session.
    #[must_use]
    pub fn is_revealed(&self, block_id: &BlockId) -> bool {
        self.revealed_blocks.contains(block_id)
    }

    /// Union of every intent ID ever classified in this session.
    ///
    /// Prerequisite gating checks against this set; an intent counts even
    /// when its interaction revealed nothing.
    #[must_use]
    pub fn intent_history(&self) -> HashSet<&IntentId> {
        self.interactions.iter().map(|i| &i.intent_id).collect()
    }

    /// Number of interactions that revealed at least one block.
    #[must_use]
    pub fn info_gathering_count(&self) -> usize {
        self.interactions.iter().filter(|i| i.revealed_anything()).count()
    }
}
