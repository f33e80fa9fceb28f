//! The structured veto envelope.
//!
//! When a gate blocks a tool call, the model receives a JSON string with
//! a stable `error_type` / `code` pair plus whatever context the check
//! can attach (offending filename, command, expected/actual hashes...).
//! The envelope is the model's only recovery signal, so the shape is
//! part of the protocol.

use serde::Deserialize;
use serde::Serialize;

/// Error taxonomy. Kinds, not type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateErrorKind {
    MissingIntent,
    NoActiveIntent,
    IntentMismatch,
    InvalidMetadata,
    ScopeViolation,
    UnknownTargets,
    CommandNotAuthorized,
    DestructiveIntentDenied,
    DestructiveOperationDenied,
    StaleFile,
    StaleLock,
    MissingParameter,
    ParseError,
    WriteProtected,
    AccessDenied,
}

/// Stable requirement codes attached to vetoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateCode {
    #[serde(rename = "REQ-001")]
    Req001,
    #[serde(rename = "REQ-002")]
    Req002,
    #[serde(rename = "REQ-003")]
    Req003,
    #[serde(rename = "REQ-004")]
    Req004,
    #[serde(rename = "REQ-005")]
    Req005,
    #[serde(rename = "REQ-006")]
    Req006,
    #[serde(rename = "REQ-007")]
    Req007,
    #[serde(rename = "REQ-008")]
    Req008,
    #[serde(rename = "REQ-009")]
    Req009,
    #[serde(rename = "CMD-001")]
    Cmd001,
    #[serde(rename = "HOOK-INT-001")]
    HookInt001,
}

impl GateCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateCode::Req001 => "REQ-001",
            GateCode::Req002 => "REQ-002",
            GateCode::Req003 => "REQ-003",
            GateCode::Req004 => "REQ-004",
            GateCode::Req005 => "REQ-005",
            GateCode::Req006 => "REQ-006",
            GateCode::Req007 => "REQ-007",
            GateCode::Req008 => "REQ-008",
            GateCode::Req009 => "REQ-009",
            GateCode::Cmd001 => "CMD-001",
            GateCode::HookInt001 => "HOOK-INT-001",
        }
    }
}

/// The veto envelope surfaced to the model as a structured tool error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} [{}]", .code.as_str())]
pub struct GateError {
    pub error_type: GateErrorKind,

    pub code: GateCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,

    pub tool: String,

    pub message: String,

    // Context-specific extras.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_intent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
}

impl GateError {
    pub fn new(
        error_type: GateErrorKind,
        code: GateCode,
        tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            code,
            intent_id: None,
            tool: tool.into(),
            message: message.into(),
            filename: None,
            path: None,
            command: None,
            expected_hash: None,
            actual_hash: None,
            mutation_class: None,
            provided_intent_id: None,
            targets: None,
        }
    }

    pub fn with_intent(mut self, intent_id: impl Into<String>) -> Self {
        self.intent_id = Some(intent_id.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_hashes(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected_hash = Some(expected.into());
        self.actual_hash = Some(actual.into());
        self
    }

    pub fn with_mutation_class(mut self, class: impl Into<String>) -> Self {
        self.mutation_class = Some(class.into());
        self
    }

    pub fn with_provided_intent_id(mut self, id: impl Into<String>) -> Self {
        self.provided_intent_id = Some(id.into());
        self
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Render the envelope as the JSON string handed back to the model.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // Serialization of this plain struct cannot realistically
            // fail; fall back to a minimal hand-built envelope.
            format!(
                "{{\"error_type\":\"internal\",\"code\":\"{}\",\"message\":{:?}}}",
                self.code.as_str(),
                self.message
            )
        })
    }
}

/// Transient record of the most recent optimistic-lock failure; consumed
/// by the lessons-learned post-hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub tool: String,
    pub path: String,
    pub expected_hash: String,
    pub actual_hash: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}
