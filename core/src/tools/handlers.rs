//! Built-in tool handlers.
//!
//! These cover the minimum surface the middleware governs: whole-file
//! writes, marker-level patch application, command authorization, file
//! reads, and the intent-selection echo. Real hosts register richer
//! handlers; the contract they must honor is the final optimistic
//! re-check before every write.

use async_trait::async_trait;
use tracing::debug;
use ward_protocol::ToolArgs;
use ward_protocol::ToolCall;
use ward_protocol::ToolResult;

use crate::gate::paths::MARKER_ADD;
use crate::gate::paths::MARKER_DELETE;
use crate::gate::paths::MARKER_MOVE;
use crate::gate::paths::MARKER_UPDATE;
use crate::session::Session;
use crate::snapshot::check_optimistic_lock;
use crate::tools::ToolHandler;

/// Whole-file write.
pub struct WriteFileHandler;

#[async_trait]
impl ToolHandler for WriteFileHandler {
    async fn handle(&self, session: &Session, call: &ToolCall) -> ToolResult {
        let ToolArgs::Write { path, body, .. } = &call.args else {
            return ToolResult::error("write_file requires `path` and `body`");
        };
        if path.trim().is_empty() {
            return ToolResult::error("write_file requires a non-empty `path`");
        }

        // Final read-and-compare immediately before the write.
        if let Err(err) = check_optimistic_lock(session, &call.id, path, &call.name).await {
            return ToolResult::error(err.to_json_string());
        }

        if let Err(err) = session.fs.write(&session.resolve(path), body.as_bytes()).await {
            return ToolResult::error(err.to_string());
        }

        let normalized = session.normalize(path);
        session.state.lock().await.clear_stale_block(&normalized);
        ToolResult::ok(format!("wrote {normalized}"))
    }
}

/// One operation parsed out of a patch body.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    Add {
        path: String,
        content: String,
    },
    Update {
        path: String,
        move_to: Option<String>,
        content: Option<String>,
    },
    Delete {
        path: String,
    },
}

/// Marker-level patch parser.
///
/// Understands the `*** Add File:` / `*** Update File:` /
/// `*** Delete File:` / `*** Move to:` headers with `+`-prefixed content
/// lines; `*** Begin Patch` / `*** End Patch` framing is optional.
/// Context-diff reconstruction belongs to the host, not the middleware.
pub fn parse_patch(patch: &str) -> Vec<PatchOp> {
    let mut ops: Vec<PatchOp> = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    fn attach_content(ops: &mut [PatchOp], pending: &mut Vec<String>) {
        if pending.is_empty() {
            return;
        }
        let content = format!("{}\n", pending.join("\n"));
        pending.clear();
        match ops.last_mut() {
            Some(PatchOp::Add { content: slot, .. }) => *slot = content,
            Some(PatchOp::Update { content: slot, .. }) => *slot = Some(content),
            _ => {}
        }
    }

    for line in patch.lines() {
        let trimmed = line.trim_start();
        if let Some(path) = trimmed.strip_prefix(MARKER_ADD) {
            attach_content(&mut ops, &mut pending);
            ops.push(PatchOp::Add {
                path: path.trim().to_string(),
                content: String::new(),
            });
        } else if let Some(path) = trimmed.strip_prefix(MARKER_UPDATE) {
            attach_content(&mut ops, &mut pending);
            ops.push(PatchOp::Update {
                path: path.trim().to_string(),
                move_to: None,
                content: None,
            });
        } else if let Some(path) = trimmed.strip_prefix(MARKER_DELETE) {
            attach_content(&mut ops, &mut pending);
            ops.push(PatchOp::Delete {
                path: path.trim().to_string(),
            });
        } else if let Some(path) = trimmed.strip_prefix(MARKER_MOVE) {
            if let Some(PatchOp::Update { move_to, .. }) = ops.last_mut() {
                *move_to = Some(path.trim().to_string());
            }
        } else if let Some(content) = trimmed.strip_prefix('+') {
            pending.push(content.to_string());
        }
        // Everything else (framing, context lines) is ignored here.
    }
    attach_content(&mut ops, &mut pending);

    ops
}

/// Marker-level patch application.
pub struct ApplyPatchHandler;

#[async_trait]
impl ToolHandler for ApplyPatchHandler {
    async fn handle(&self, session: &Session, call: &ToolCall) -> ToolResult {
        let Some(patch) = call.args.patch_body() else {
            return ToolResult::error("apply_patch requires a `patch` body");
        };

        let ops = parse_patch(patch);
        if ops.is_empty() {
            return ToolResult::error("patch contained no operations");
        }

        let mut summary = Vec::new();
        for op in ops {
            let outcome = self.apply_one(session, call, &op).await;
            match outcome {
                Ok(line) => summary.push(line),
                Err(result) => return result,
            }
        }

        ToolResult::ok(summary.join("\n"))
    }
}

impl ApplyPatchHandler {
    async fn apply_one(
        &self,
        session: &Session,
        call: &ToolCall,
        op: &PatchOp,
    ) -> Result<String, ToolResult> {
        match op {
            PatchOp::Add { path, content } => {
                check_optimistic_lock(session, &call.id, path, &call.name)
                    .await
                    .map_err(|e| ToolResult::error(e.to_json_string()))?;
                session
                    .fs
                    .write(&session.resolve(path), content.as_bytes())
                    .await
                    .map_err(|e| ToolResult::error(e.to_string()))?;
                let normalized = session.normalize(path);
                session.state.lock().await.clear_stale_block(&normalized);
                Ok(format!("added {normalized}"))
            }
            PatchOp::Update {
                path,
                move_to,
                content,
            } => {
                check_optimistic_lock(session, &call.id, path, &call.name)
                    .await
                    .map_err(|e| ToolResult::error(e.to_json_string()))?;

                // A pure move carries no `+` lines; the current content
                // travels with the file.
                let new_content = match content {
                    Some(content) => content.clone(),
                    None => match session.fs.read(&session.resolve(path)).await {
                        Ok(Some(existing)) => existing.text(),
                        Ok(None) => {
                            return Err(ToolResult::error(format!(
                                "cannot update missing file `{path}`"
                            )));
                        }
                        Err(e) => return Err(ToolResult::error(e.to_string())),
                    },
                };

                let destination = move_to.as_deref().unwrap_or(path.as_str());
                session
                    .fs
                    .write(&session.resolve(destination), new_content.as_bytes())
                    .await
                    .map_err(|e| ToolResult::error(e.to_string()))?;
                if move_to.is_some() {
                    session
                        .fs
                        .remove(&session.resolve(path))
                        .await
                        .map_err(|e| ToolResult::error(e.to_string()))?;
                }

                let normalized = session.normalize(destination);
                session.state.lock().await.clear_stale_block(&normalized);
                match move_to {
                    Some(_) => Ok(format!("moved {} -> {normalized}", session.normalize(path))),
                    None => Ok(format!("updated {normalized}")),
                }
            }
            PatchOp::Delete { path } => {
                check_optimistic_lock(session, &call.id, path, &call.name)
                    .await
                    .map_err(|e| ToolResult::error(e.to_json_string()))?;
                session
                    .fs
                    .remove(&session.resolve(path))
                    .await
                    .map_err(|e| ToolResult::error(e.to_string()))?;
                let normalized = session.normalize(path);
                session.state.lock().await.clear_stale_block(&normalized);
                Ok(format!("deleted {normalized}"))
            }
        }
    }
}

/// Command authorization endpoint.
///
/// The middleware authorizes commands; spawning them is the host's
/// concern. A call that reaches this handler has already cleared the
/// command gate, so the handler just hands the authorized command back.
pub struct ExecuteCommandHandler;

#[async_trait]
impl ToolHandler for ExecuteCommandHandler {
    async fn handle(&self, _session: &Session, call: &ToolCall) -> ToolResult {
        let Some(command) = call.args.command() else {
            return ToolResult::error("execute_command requires a `command`");
        };
        debug!(command, "command authorized for host execution");
        ToolResult::ok(format!("authorized: {command}"))
    }
}

/// Read-only file access.
pub struct ReadFileHandler;

#[async_trait]
impl ToolHandler for ReadFileHandler {
    async fn handle(&self, session: &Session, call: &ToolCall) -> ToolResult {
        let ToolArgs::Read { path } = &call.args else {
            return ToolResult::error("read_file requires a `path`");
        };

        match session.fs.read(&session.resolve(path)).await {
            Ok(Some(content)) if content.is_binary() => {
                ToolResult::error(format!("`{path}` is binary"))
            }
            Ok(Some(content)) => ToolResult::ok(content.text()),
            Ok(None) => ToolResult::error(format!("file not found: {path}")),
            Err(err) => ToolResult::error(err.to_string()),
        }
    }
}

/// Echoes the context block bound by the selection hook.
pub struct SelectIntentHandler;

#[async_trait]
impl ToolHandler for SelectIntentHandler {
    async fn handle(&self, session: &Session, _call: &ToolCall) -> ToolResult {
        let state = session.state.lock().await;
        match state.active_intent() {
            Some(active) => ToolResult::ok(active.context_block.clone()),
            None => ToolResult::error("no active intent was bound"),
        }
    }
}
