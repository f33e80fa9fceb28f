//! The per-tool dispatch loop.
//!
//! One call, one pipeline: pre hooks in order (fail-fast), the handler,
//! post hooks (collected, never fatal). A session serves one in-flight
//! call at a time; the dispatch lock rejects overlap rather than
//! queueing, since the LLM layer already serializes calls per session.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use tracing::info;
use ward_hooks::HookEngine;
use ward_hooks::PostDispatchEntry;
use ward_protocol::ToolCall;
use ward_protocol::ToolResult;

use crate::gate::ScopeGateHook;
use crate::intent::SelectIntentHook;
use crate::knowledge::LessonsLearnedHook;
use crate::session::Session;
use crate::snapshot::SnapshotHook;
use crate::tools::ToolRegistry;
use crate::trace::TraceWriterHook;

/// Everything one dispatch produced.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The structured result for the LLM layer.
    pub result: ToolResult,

    /// Context injected by pre hooks (e.g. the intent context block).
    pub injected_context: Option<String>,

    /// Name of the vetoing hook, when the call was blocked.
    pub vetoed_by: Option<String>,

    /// Post-hook outcomes, for hosts that surface audit state.
    pub post: Vec<PostDispatchEntry>,
}

/// The dispatch driver: hook engine + handler registry.
pub struct Driver {
    engine: HookEngine<Session>,
    registry: ToolRegistry,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// The standard governance pipeline: intent selection, the scope
    /// gate, snapshot capture; then trace writing and lessons learned.
    pub fn new() -> Self {
        let mut engine = HookEngine::new();
        engine.register_pre(Arc::new(SelectIntentHook));
        engine.register_pre(Arc::new(ScopeGateHook));
        engine.register_pre(Arc::new(SnapshotHook));
        engine.register_post(Arc::new(TraceWriterHook));
        engine.register_post(Arc::new(LessonsLearnedHook));

        Self {
            engine,
            registry: ToolRegistry::default(),
        }
    }

    /// A driver with no hooks and no handlers, for hosts that assemble
    /// their own pipeline.
    pub fn bare() -> Self {
        Self {
            engine: HookEngine::new(),
            registry: ToolRegistry::empty(),
        }
    }

    pub fn engine_mut(&mut self) -> &mut HookEngine<Session> {
        &mut self.engine
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    /// Dispatch one tool call through the full pipeline.
    pub async fn dispatch(&self, session: &Session, call: &ToolCall) -> DispatchOutcome {
        // Partial calls are streaming previews: hooks pass through and
        // nothing executes.
        if call.partial {
            debug!(call = %call.id, tool = %call.name, "partial call; nothing to dispatch");
            return DispatchOutcome {
                result: ToolResult::ok(""),
                injected_context: None,
                vetoed_by: None,
                post: Vec::new(),
            };
        }

        if !session.state.lock().await.try_begin_dispatch() {
            return DispatchOutcome {
                result: ToolResult::error(
                    "a tool call is already in flight for this session",
                ),
                injected_context: None,
                vetoed_by: None,
                post: Vec::new(),
            };
        }

        let outcome = self.dispatch_locked(session, call).await;
        session.state.lock().await.end_dispatch();
        outcome
    }

    async fn dispatch_locked(&self, session: &Session, call: &ToolCall) -> DispatchOutcome {
        let pre = self.engine.execute_pre(session, call).await;

        if !pre.proceed {
            let content = pre
                .error_content()
                .unwrap_or_else(|| "tool call vetoed".to_string());
            info!(
                call = %call.id,
                tool = %call.name,
                vetoed_by = pre.vetoed_by.as_deref().unwrap_or("?"),
                "tool call vetoed before execution"
            );
            session
                .diagnostics
                .emit(
                    "dispatch_vetoed",
                    json!({"tool": call.name, "hook": pre.vetoed_by}),
                )
                .await;
            return DispatchOutcome {
                result: ToolResult::error(content),
                injected_context: pre.injected_context,
                vetoed_by: pre.vetoed_by,
                post: Vec::new(),
            };
        }

        // Handlers and post hooks see the gate's argument rewrites.
        let mut effective = call.clone();
        if let Some(args) = pre.modified_args {
            effective.args = args;
        }

        let result = self.registry.handle(session, &effective).await;
        debug!(
            call = %effective.id,
            tool = %effective.name,
            success = result.success,
            "handler completed"
        );

        let post = self.engine.execute_post(session, &effective, &result).await;
        for entry in &post {
            if !entry.outcome.success {
                session
                    .diagnostics
                    .emit(
                        "post_hook_failed",
                        json!({
                            "hook": entry.hook,
                            "tool": effective.name,
                            "error": entry.outcome.error,
                        }),
                    )
                    .await;
            }
        }

        DispatchOutcome {
            result,
            injected_context: pre.injected_context,
            vetoed_by: None,
            post,
        }
    }
}
