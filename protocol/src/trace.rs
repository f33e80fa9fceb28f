//! Append-only audit trace entries.
//!
//! One [`TraceEntry`] is appended to `agent_trace.jsonl` for every
//! completed mutating tool call. Entries link an intent, a tool
//! invocation, and the content hashes of the affected files and of the
//! line ranges the invocation added.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::tool_call::MutationClass;

/// Who produced a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Model identifier reported by the LLM layer (e.g. provider/model).
    pub model_identifier: String,

    /// Host task identifier, if the host runs tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Session / process instance identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Version-control context captured at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsInfo {
    /// Current revision id (commit hash), if the workspace is versioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

/// A link from a conversation to another record (typically the intent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Related {
    /// Link to an intent id.
    pub fn intent(id: impl Into<String>) -> Self {
        Self {
            kind: "intent".to_string(),
            value: id.into(),
        }
    }
}

/// A 1-indexed line range in the post-image, with a hash of the added
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeTrace {
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
}

/// One attributed edit conversation within a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub contributor: Contributor,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Related>,

    /// Added line ranges. Empty for binary files.
    #[serde(default)]
    pub ranges: Vec<RangeTrace>,
}

/// Per-file attribution inside a trace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTrace {
    /// POSIX path relative to the session working directory.
    pub relative_path: String,

    /// SHA-256 over the file's raw bytes at the instant of write.
    pub content_hash: String,

    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

impl FileTrace {
    /// True if this entry (or any of its conversations) links to the
    /// given intent id.
    pub fn relates_to_intent(&self, intent_id: &str) -> bool {
        self.conversations.iter().any(|c| {
            c.related
                .iter()
                .any(|r| r.kind == "intent" && r.value == intent_id)
        })
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// UUID of this entry.
    pub id: String,

    /// ISO-8601 UTC timestamp.
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_class: Option<MutationClass>,

    /// Tool name.
    pub tool: String,

    /// The LLM layer's stable call id.
    pub tool_use_id: String,

    /// Whitelisted parameter subset; patch/diff bodies redacted.
    #[serde(default)]
    pub params: Map<String, Value>,

    pub contributor: Contributor,

    #[serde(default)]
    pub vcs: VcsInfo,

    #[serde(default)]
    pub files: Vec<FileTrace>,
}

impl TraceEntry {
    /// True if this entry should appear in the brief history of the
    /// given intent: either its top-level `intent_id` matches, or any
    /// file conversation links to the intent.
    pub fn relates_to_intent(&self, intent_id: &str) -> bool {
        self.intent_id.as_deref() == Some(intent_id)
            || self.files.iter().any(|f| f.relates_to_intent(intent_id))
    }
}
