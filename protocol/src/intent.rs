//! Intent records.
//!
//! Intents are authored outside the middleware and arrive as entries in
//! the orchestration directory's `active_intents.yaml`. The middleware
//! treats them as read-only: it selects, renders, and enforces them, but
//! never writes them back.

use serde::Deserialize;
use serde::Serialize;

/// Lifecycle status of an intent.
///
/// Only `InProgress` intents may be selected as the session's active
/// intent; everything else is rejected by the selection handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Pending,
    InProgress,
    Done,
    Abandoned,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "PENDING",
            IntentStatus::InProgress => "IN_PROGRESS",
            IntentStatus::Done => "DONE",
            IntentStatus::Abandoned => "ABANDONED",
        }
    }
}

/// A declarative record of a development goal with an owned scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Opaque unique identifier (e.g. `INT-42`).
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Lifecycle status.
    pub status: IntentStatus,

    /// Ordered path patterns this intent is authorized to mutate.
    ///
    /// Entries containing glob metacharacters (`*`, `?`, `[`, `]`) are
    /// matched gitignore-style; all other entries are literal path
    /// prefixes.
    #[serde(default)]
    pub owned_scope: Vec<String>,

    /// Free-text constraints the agent must honor.
    #[serde(default)]
    pub constraints: Vec<String>,

    /// Free-text acceptance criteria.
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

impl Intent {
    /// True if this intent can be selected as the session's active intent.
    pub fn is_selectable(&self) -> bool {
        self.status == IntentStatus::InProgress
    }
}

/// Top-level shape of `active_intents.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentsFile {
    #[serde(default)]
    pub active_intents: Vec<Intent>,
}

impl IntentsFile {
    /// Look up an intent by id.
    pub fn find(&self, id: &str) -> Option<&Intent> {
        self.active_intents.iter().find(|i| i.id == id)
    }

    /// All intents currently `IN_PROGRESS`.
    pub fn in_progress(&self) -> impl Iterator<Item = &Intent> {
        self.active_intents.iter().filter(|i| i.is_selectable())
    }
}
