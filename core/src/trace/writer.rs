//! The trace-writer post-hook.
//!
//! After a mutating handler completes, append one [`TraceEntry`] to
//! `agent_trace.jsonl`: provenance metadata, a sanitized parameter
//! subset, and per-file content hashes with added-range attribution.
//! Writer failures are reported in the hook outcome but never fail the
//! tool call.

use std::path::Path;

use async_trait::async_trait;
use chrono::SecondsFormat;
use chrono::Utc;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;
use ward_hooks::HookFailure;
use ward_hooks::PostHook;
use ward_hooks::PostOutcome;
use ward_protocol::Conversation;
use ward_protocol::FileTrace;
use ward_protocol::MutationClass;
use ward_protocol::Related;
use ward_protocol::ToolCall;
use ward_protocol::ToolResult;
use ward_protocol::TraceEntry;
use ward_protocol::VcsInfo;

use crate::gate::paths::extract_target_paths;
use crate::session::Session;
use crate::sha256_hex;
use crate::trace::ranges::added_ranges;

/// Parameter keys copied into the trace verbatim.
const PARAM_ALLOW_LIST: &[&str] = &[
    "path",
    "file_path",
    "intent_id",
    "mutation_class",
    "command",
    "prompt",
    "image",
];

/// Parameter keys whose values are replaced with `"[redacted]"`.
const PARAM_REDACT_LIST: &[&str] = &["patch", "diff", "old_string", "new_string"];

/// Sanitize call params to the fixed allow-list.
pub fn sanitize_params(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in raw {
        if PARAM_ALLOW_LIST.contains(&key.as_str()) {
            out.insert(key.clone(), value.clone());
        } else if PARAM_REDACT_LIST.contains(&key.as_str()) {
            out.insert(key.clone(), Value::String("[redacted]".to_string()));
        }
    }
    out
}

/// Best-effort current VCS revision: resolves `.git/HEAD` by hand so the
/// middleware needs no VCS binary or library.
pub fn vcs_revision(cwd: &Path) -> Option<String> {
    let head = std::fs::read_to_string(cwd.join(".git/HEAD")).ok()?;
    let head = head.trim();

    if let Some(reference) = head.strip_prefix("ref: ") {
        let resolved = std::fs::read_to_string(cwd.join(".git").join(reference)).ok()?;
        let resolved = resolved.trim();
        (!resolved.is_empty()).then(|| resolved.to_string())
    } else {
        (!head.is_empty()).then(|| head.to_string())
    }
}

pub struct TraceWriterHook;

impl TraceWriterHook {
    async fn build_entry(
        &self,
        session: &Session,
        call: &ToolCall,
    ) -> Result<TraceEntry, String> {
        let mut state = session.state.lock().await;
        let intent_id = call
            .args
            .intent_id()
            .map(str::to_string)
            .or_else(|| state.active_intent().map(|a| a.id.clone()));
        let snapshots = state.take_snapshots(&call.id);
        drop(state);

        let mutation_class = call
            .args
            .mutation_class()
            .unwrap_or(MutationClass::IntentEvolution);

        let contributor = session.contributor.clone();
        let related: Vec<Related> = intent_id
            .as_deref()
            .map(|id| vec![Related::intent(id)])
            .unwrap_or_default();

        let mut files = Vec::new();
        for raw in extract_target_paths(&call.args) {
            let normalized = session.normalize(&raw);
            if normalized.is_empty() {
                continue;
            }

            let Some(content) = session
                .fs
                .read(&session.resolve(&raw))
                .await
                .map_err(|err| err.to_string())?
            else {
                // Deleted by this call (or never created): hash nothing,
                // attribute nothing.
                debug!(path = %normalized, "target absent after mutation; skipping file trace");
                continue;
            };

            let content_hash = sha256_hex(&content.bytes);
            let snapshot = crate::paths::candidates(&raw, &session.cwd)
                .into_iter()
                .find_map(|candidate| snapshots.get(&candidate).cloned());

            // Binary files carry only the whole-file hash.
            let ranges = if content.is_binary() {
                Vec::new()
            } else {
                let before = snapshot.as_ref().and_then(|s| s.before.clone());
                added_ranges(before.as_deref(), &content.text())
            };

            files.push(FileTrace {
                relative_path: normalized,
                content_hash,
                conversations: vec![Conversation {
                    contributor: contributor.clone(),
                    related: related.clone(),
                    ranges,
                }],
            });
        }

        Ok(TraceEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            intent_id,
            mutation_class: Some(mutation_class),
            tool: call.name.clone(),
            tool_use_id: call.id.clone(),
            params: sanitize_params(&call.args.to_map()),
            contributor,
            vcs: VcsInfo {
                revision_id: vcs_revision(&session.cwd),
            },
            files,
        })
    }
}

#[async_trait]
impl PostHook<Session> for TraceWriterHook {
    fn name(&self) -> &str {
        "trace_writer"
    }

    async fn run(
        &self,
        session: &Session,
        call: &ToolCall,
        result: &ToolResult,
    ) -> Result<PostOutcome, HookFailure> {
        if call.partial || !session.tools.is_mutating(&call.name) {
            return Ok(PostOutcome::ok());
        }
        if !result.success {
            // The mutation did not land; drop the snapshot without
            // recording a trace entry.
            session.state.lock().await.take_snapshots(&call.id);
            return Ok(PostOutcome::ok());
        }

        let entry = match self.build_entry(session, call).await {
            Ok(entry) => entry,
            Err(message) => return Ok(PostOutcome::failed(message)),
        };

        match ward_utils_lockfile::append_jsonl(&session.paths.trace_file(), &entry).await {
            Ok(()) => Ok(PostOutcome::ok_with(format!(
                "trace entry {} appended",
                entry.id
            ))),
            Err(err) => Ok(PostOutcome::failed(format!(
                "failed to append trace entry: {err}"
            ))),
        }
    }
}
