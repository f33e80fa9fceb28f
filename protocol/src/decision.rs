//! Persisted HITL decisions.
//!
//! Every human-in-the-loop prompt result is appended to
//! `intent-decisions.jsonl` and cached in-session. Persisted approvals
//! for an identical `(tool, command, intent_id)` triple are reused on
//! later turns without re-prompting.

use serde::Deserialize;
use serde::Serialize;

/// Approve/reject outcome of a single prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionVerdict {
    Approved,
    Rejected,
}

/// One append-only decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,

    pub tool: String,

    pub decision: DecisionVerdict,

    /// Tag naming the check that prompted (e.g. `scope_violation`,
    /// `destructive_command`, `stale_override`).
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_classification: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_classification: Option<String>,

    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

impl Decision {
    pub fn approved(&self) -> bool {
        self.decision == DecisionVerdict::Approved
    }

    /// True if this record authorizes the given command for the given
    /// intent.
    pub fn covers_command(&self, tool: &str, command: &str, intent_id: Option<&str>) -> bool {
        self.approved()
            && self.tool == tool
            && self.command.as_deref() == Some(command)
            && self.intent_id.as_deref() == intent_id
    }
}
