//! Pre-mutation snapshots and optimistic locking.
//!
//! Before a mutating handler runs, the snapshot hook captures each
//! target file's content. Handlers call [`check_optimistic_lock`] before
//! and again just before writing (closing the time-of-check/time-of-use
//! window); a mismatch produces the `stale_file` envelope, records a
//! [`VerificationFailure`] for the lessons-learned hook, and stale-blocks
//! the path until an explicit override.

use async_trait::async_trait;
use chrono::SecondsFormat;
use chrono::Utc;
use tracing::debug;
use ward_hooks::HookFailure;
use ward_hooks::PreHook;
use ward_hooks::PreOutcome;
use ward_protocol::GateCode;
use ward_protocol::GateError;
use ward_protocol::GateErrorKind;
use ward_protocol::ToolCall;
use ward_protocol::VerificationFailure;

use crate::gate::paths::extract_target_paths;
use crate::session::Session;
use crate::session::Snapshot;
use crate::session::StaleBlock;
use crate::sha256_hex;

/// Captures `{before, existed, binary}` for every target of a mutating
/// call. Runs after the scope gate, so only authorized calls are
/// snapshotted.
pub struct SnapshotHook;

#[async_trait]
impl PreHook<Session> for SnapshotHook {
    fn name(&self) -> &str {
        "snapshot_capture"
    }

    async fn run(&self, session: &Session, call: &ToolCall) -> Result<PreOutcome, HookFailure> {
        if call.partial || !session.tools.is_mutating(&call.name) {
            return Ok(PreOutcome::proceed());
        }

        for raw in extract_target_paths(&call.args) {
            let normalized = session.normalize(&raw);
            if normalized.is_empty() {
                continue;
            }

            let content = session
                .fs
                .read(&session.resolve(&raw))
                .await
                .map_err(|err| HookFailure::new(self.name(), err.to_string()))?;

            let snapshot = match content {
                Some(content) => {
                    let binary = content.is_binary();
                    Snapshot {
                        before: (!binary).then(|| content.text()),
                        existed: true,
                        binary,
                    }
                }
                None => Snapshot {
                    before: None,
                    existed: false,
                    binary: false,
                },
            };

            debug!(
                call = %call.id,
                path = %normalized,
                existed = snapshot.existed,
                binary = snapshot.binary,
                "captured pre-mutation snapshot"
            );
            session
                .state
                .lock()
                .await
                .put_snapshot(&call.id, normalized, snapshot);
        }

        Ok(PreOutcome::proceed())
    }
}

/// Hash used for "no content": the hash of the empty byte string, so the
/// envelope always carries two comparable values.
fn hash_or_empty(text: Option<&str>) -> String {
    sha256_hex(text.unwrap_or_default().as_bytes())
}

/// Re-validate a snapshot against the filesystem.
///
/// Stale iff existence disagrees with the snapshot, or (for text files)
/// the content hash changed. Binary files are never stale through this
/// path. On stale: records a verification failure, stale-blocks the
/// path, and returns the structured envelope.
pub async fn check_optimistic_lock(
    session: &Session,
    call_id: &str,
    raw_path: &str,
    tool: &str,
) -> Result<(), GateError> {
    let snapshot = {
        let state = session.state.lock().await;
        crate::paths::candidates(raw_path, &session.cwd)
            .into_iter()
            .find_map(|candidate| state.snapshot(call_id, &candidate).cloned())
    };

    // No snapshot means the path was not captured (e.g. a handler-added
    // target); nothing to validate against.
    let Some(snapshot) = snapshot else {
        debug!(call = %call_id, path = raw_path, "no snapshot; skipping lock check");
        return Ok(());
    };

    let current = session
        .fs
        .read(&session.resolve(raw_path))
        .await
        .map_err(|err| {
            GateError::new(
                GateErrorKind::AccessDenied,
                GateCode::Req007,
                tool,
                format!("could not re-read `{raw_path}`: {err}"),
            )
            .with_path(raw_path.to_string())
        })?;

    let stale = match (&current, snapshot.existed) {
        (None, true) | (Some(_), false) => true,
        (None, false) => false,
        (Some(content), true) => {
            if snapshot.binary || content.is_binary() {
                false
            } else {
                sha256_hex(content.text().as_bytes()) != hash_or_empty(snapshot.before.as_deref())
            }
        }
    };

    if !stale {
        return Ok(());
    }

    let expected = hash_or_empty(snapshot.before.as_deref());
    let actual = hash_or_empty(current.map(|c| c.text()).as_deref());
    let normalized = session.normalize(raw_path);
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut state = session.state.lock().await;
    state.record_verification_failure(VerificationFailure {
        tool: tool.to_string(),
        path: normalized.clone(),
        expected_hash: expected.clone(),
        actual_hash: actual.clone(),
        timestamp: timestamp.clone(),
    });
    state.set_stale_block(
        normalized.clone(),
        StaleBlock {
            timestamp: Utc::now(),
            tool: tool.to_string(),
        },
    );
    drop(state);

    session
        .diagnostics
        .emit(
            "stale_file",
            serde_json::json!({"path": normalized, "tool": tool}),
        )
        .await;

    Err(GateError::new(
        GateErrorKind::StaleFile,
        GateCode::Req007,
        tool,
        format!("`{normalized}` changed since it was snapshotted; re-read it and retry"),
    )
    .with_path(normalized)
    .with_hashes(expected, actual))
}
