//! Tool calls and their arguments.
//!
//! The LLM layer hands the middleware a parsed [`ToolCall`]. Arguments
//! are modeled as a per-tool tagged variant rather than an untyped bag;
//! the [`ToolArgs::Unknown`] branch preserves forward compatibility with
//! host tools the middleware has no special knowledge of.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Well-known tool names the middleware treats specially.
pub mod tool_names {
    /// The intent-selection handshake tool.
    pub const SELECT_ACTIVE_INTENT: &str = "select_active_intent";
    /// The shell-execution tool.
    pub const EXECUTE_COMMAND: &str = "execute_command";
    /// Whole-file write.
    pub const WRITE_FILE: &str = "write_file";
    /// Patch application (add/update/delete/move hunks).
    pub const APPLY_PATCH: &str = "apply_patch";
    /// Read-only file access.
    pub const READ_FILE: &str = "read_file";
}

/// The two allowed mutation classes.
///
/// `AstRefactor` marks semantics-preserving restructuring;
/// `IntentEvolution` marks changes that advance the intent itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationClass {
    AstRefactor,
    IntentEvolution,
}

impl MutationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationClass::AstRefactor => "AST_REFACTOR",
            MutationClass::IntentEvolution => "INTENT_EVOLUTION",
        }
    }

    /// Parse the wire form. Anything else is invalid metadata.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AST_REFACTOR" => Some(MutationClass::AstRefactor),
            "INTENT_EVOLUTION" => Some(MutationClass::IntentEvolution),
            _ => None,
        }
    }
}

/// Per-tool typed arguments.
///
/// `mutation_class` is carried as the raw wire string so the gate can
/// tell "absent, inject the default" apart from "present but invalid,
/// veto". Parsing eagerly would collapse the two.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    Write {
        path: String,
        body: String,
        intent_id: Option<String>,
        mutation_class: Option<String>,
    },
    ApplyPatch {
        patch: String,
        intent_id: Option<String>,
        mutation_class: Option<String>,
    },
    ExecuteCommand {
        command: String,
        intent_id: Option<String>,
    },
    SelectIntent {
        intent_id: Option<String>,
    },
    Read {
        path: String,
    },
    /// Any host tool the middleware has no typed representation for.
    Unknown(Map<String, Value>),
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

impl ToolArgs {
    /// Build typed args from the raw `(tool_name, json)` pair produced by
    /// the LLM layer. Unrecognized tools and malformed payloads fall back
    /// to [`ToolArgs::Unknown`] so the pipeline can still reason about
    /// them via the generic key scan.
    pub fn from_named(tool: &str, value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            // Non-object payloads carry nothing we can type.
            _ => Map::new(),
        };

        let intent_id = string_field(&map, "intent_id");
        let mutation_class = string_field(&map, "mutation_class");

        match tool {
            tool_names::WRITE_FILE => {
                let path = string_field(&map, "path")
                    .or_else(|| string_field(&map, "file_path"))
                    .unwrap_or_default();
                let body = string_field(&map, "body")
                    .or_else(|| string_field(&map, "content"))
                    .unwrap_or_default();
                ToolArgs::Write {
                    path,
                    body,
                    intent_id,
                    mutation_class,
                }
            }
            tool_names::APPLY_PATCH => {
                let patch = string_field(&map, "patch")
                    .or_else(|| string_field(&map, "diff"))
                    .unwrap_or_default();
                ToolArgs::ApplyPatch {
                    patch,
                    intent_id,
                    mutation_class,
                }
            }
            tool_names::EXECUTE_COMMAND => ToolArgs::ExecuteCommand {
                command: string_field(&map, "command").unwrap_or_default(),
                intent_id,
            },
            tool_names::SELECT_ACTIVE_INTENT => ToolArgs::SelectIntent { intent_id },
            tool_names::READ_FILE => ToolArgs::Read {
                path: string_field(&map, "path")
                    .or_else(|| string_field(&map, "file_path"))
                    .unwrap_or_default(),
            },
            _ => ToolArgs::Unknown(map),
        }
    }

    /// The declared intent id, if any.
    pub fn intent_id(&self) -> Option<&str> {
        match self {
            ToolArgs::Write { intent_id, .. }
            | ToolArgs::ApplyPatch { intent_id, .. }
            | ToolArgs::ExecuteCommand { intent_id, .. }
            | ToolArgs::SelectIntent { intent_id } => intent_id.as_deref(),
            ToolArgs::Unknown(map) => map.get("intent_id").and_then(Value::as_str),
            ToolArgs::Read { .. } => None,
        }
    }

    /// The declared mutation class exactly as it appeared on the wire.
    pub fn mutation_class_raw(&self) -> Option<&str> {
        match self {
            ToolArgs::Write { mutation_class, .. } | ToolArgs::ApplyPatch { mutation_class, .. } => {
                mutation_class.as_deref()
            }
            ToolArgs::Unknown(map) => map.get("mutation_class").and_then(Value::as_str),
            _ => None,
        }
    }

    /// The declared mutation class, parsed. `None` covers both absent and
    /// invalid; use [`Self::mutation_class_raw`] to distinguish.
    pub fn mutation_class(&self) -> Option<MutationClass> {
        self.mutation_class_raw().and_then(MutationClass::parse)
    }

    pub fn set_intent_id(&mut self, id: &str) {
        match self {
            ToolArgs::Write { intent_id, .. }
            | ToolArgs::ApplyPatch { intent_id, .. }
            | ToolArgs::ExecuteCommand { intent_id, .. }
            | ToolArgs::SelectIntent { intent_id } => *intent_id = Some(id.to_string()),
            ToolArgs::Unknown(map) => {
                map.insert("intent_id".to_string(), Value::String(id.to_string()));
            }
            ToolArgs::Read { .. } => {}
        }
    }

    pub fn set_mutation_class(&mut self, class: MutationClass) {
        match self {
            ToolArgs::Write { mutation_class, .. } | ToolArgs::ApplyPatch { mutation_class, .. } => {
                *mutation_class = Some(class.as_str().to_string());
            }
            ToolArgs::Unknown(map) => {
                map.insert(
                    "mutation_class".to_string(),
                    Value::String(class.as_str().to_string()),
                );
            }
            _ => {}
        }
    }

    /// The shell command string, for the command-execution tool.
    pub fn command(&self) -> Option<&str> {
        match self {
            ToolArgs::ExecuteCommand { command, .. } => Some(command.as_str()),
            ToolArgs::Unknown(map) => map.get("command").and_then(Value::as_str),
            _ => None,
        }
    }

    /// The patch/diff body, for patch-shaped tools.
    pub fn patch_body(&self) -> Option<&str> {
        match self {
            ToolArgs::ApplyPatch { patch, .. } => Some(patch.as_str()),
            ToolArgs::Unknown(map) => map
                .get("patch")
                .or_else(|| map.get("diff"))
                .and_then(Value::as_str),
            _ => None,
        }
    }

    /// Flatten back to the wire representation. Used for trace-param
    /// sanitization and generic key scans.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            ToolArgs::Write {
                path,
                body,
                intent_id,
                mutation_class,
            } => {
                map.insert("path".into(), Value::String(path.clone()));
                map.insert("body".into(), Value::String(body.clone()));
                insert_metadata(&mut map, intent_id, mutation_class);
            }
            ToolArgs::ApplyPatch {
                patch,
                intent_id,
                mutation_class,
            } => {
                map.insert("patch".into(), Value::String(patch.clone()));
                insert_metadata(&mut map, intent_id, mutation_class);
            }
            ToolArgs::ExecuteCommand { command, intent_id } => {
                map.insert("command".into(), Value::String(command.clone()));
                insert_metadata(&mut map, intent_id, &None);
            }
            ToolArgs::SelectIntent { intent_id } => {
                insert_metadata(&mut map, intent_id, &None);
            }
            ToolArgs::Read { path } => {
                map.insert("path".into(), Value::String(path.clone()));
            }
            ToolArgs::Unknown(raw) => return raw.clone(),
        }
        map
    }
}

fn insert_metadata(
    map: &mut Map<String, Value>,
    intent_id: &Option<String>,
    mutation_class: &Option<String>,
) {
    if let Some(id) = intent_id {
        map.insert("intent_id".into(), Value::String(id.clone()));
    }
    if let Some(class) = mutation_class {
        map.insert("mutation_class".into(), Value::String(class.clone()));
    }
}

/// One tool call flowing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Stable call identifier assigned by the LLM layer.
    pub id: String,

    /// Tool identifier.
    pub name: String,

    /// Typed arguments.
    pub args: ToolArgs,

    /// True while the LLM is still streaming argument deltas. Hooks that
    /// examine argument content skip partial calls.
    pub partial: bool,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        let name = name.into();
        let args = ToolArgs::from_named(&name, args);
        Self {
            id: id.into(),
            name,
            args,
            partial: false,
        }
    }

    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }
}

/// Structured result handed back to the LLM layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
        }
    }
}
