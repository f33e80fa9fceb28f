//! Target-path extraction from tool calls.
//!
//! Paths come from the recognized argument keys (`path`, `file_path`,
//! `files`) and, for patch-shaped payloads, from the patch header
//! markers. Results are deduplicated with empties dropped; callers
//! normalize.

use serde_json::Value;
use ward_protocol::ToolArgs;

pub const MARKER_ADD: &str = "*** Add File: ";
pub const MARKER_UPDATE: &str = "*** Update File: ";
pub const MARKER_DELETE: &str = "*** Delete File: ";
pub const MARKER_MOVE: &str = "*** Move to: ";

fn push_unique(out: &mut Vec<String>, value: String) {
    let value = value.trim().to_string();
    if !value.is_empty() && !out.contains(&value) {
        out.push(value);
    }
}

/// Paths named by patch header markers, in order of appearance.
pub fn patch_target_paths(patch: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in patch.lines() {
        let line = line.trim_start();
        for marker in [MARKER_ADD, MARKER_UPDATE, MARKER_DELETE, MARKER_MOVE] {
            if let Some(rest) = line.strip_prefix(marker) {
                push_unique(&mut out, rest.to_string());
            }
        }
    }
    out
}

/// True if the patch body deletes or moves files.
pub fn patch_is_destructive(patch: &str) -> bool {
    patch.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with(MARKER_DELETE) || line.starts_with(MARKER_MOVE)
    })
}

/// The deletion/move operations in a patch, for preflight summaries.
pub fn destructive_patch_summary(patch: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in patch.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix(MARKER_DELETE) {
            push_unique(&mut out, format!("delete {}", rest.trim()));
        } else if let Some(rest) = line.strip_prefix(MARKER_MOVE) {
            push_unique(&mut out, format!("move to {}", rest.trim()));
        }
    }
    out
}

/// Every target path a tool call names.
pub fn extract_target_paths(args: &ToolArgs) -> Vec<String> {
    let mut out = Vec::new();

    match args {
        ToolArgs::Write { path, .. } | ToolArgs::Read { path } => {
            push_unique(&mut out, path.clone());
        }
        ToolArgs::ApplyPatch { patch, .. } => {
            for path in patch_target_paths(patch) {
                push_unique(&mut out, path);
            }
        }
        ToolArgs::ExecuteCommand { .. } | ToolArgs::SelectIntent { .. } => {}
        ToolArgs::Unknown(map) => {
            for key in ["path", "file_path"] {
                if let Some(value) = map.get(key).and_then(Value::as_str) {
                    push_unique(&mut out, value.to_string());
                }
            }
            match map.get("files") {
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Some(s) = item.as_str() {
                            push_unique(&mut out, s.to_string());
                        }
                    }
                }
                Some(Value::String(s)) => push_unique(&mut out, s.clone()),
                _ => {}
            }
            if let Some(patch) = map
                .get("patch")
                .or_else(|| map.get("diff"))
                .and_then(Value::as_str)
            {
                for path in patch_target_paths(patch) {
                    push_unique(&mut out, path);
                }
            }
        }
    }

    out
}
