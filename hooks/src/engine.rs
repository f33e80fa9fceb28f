//! The hook engine.
//!
//! A registry of pre and post hooks, each optionally filtered by tool
//! name, executed in registration order.
//!
//! Contract:
//! - `execute_pre` stops at the first hook returning `proceed == false`
//!   and surfaces that hook's error without invoking later hooks.
//!   Injected context strings concatenate across hooks; a later
//!   `modified_args` overwrites an earlier one. A hook that fails
//!   internally is treated as a veto with a synthesized message.
//! - `execute_post` runs every matching post hook unconditionally and
//!   collects their outcomes; failures are logged, never fatal.

use std::sync::Arc;

use async_trait::async_trait;
use ward_protocol::GateError;
use ward_protocol::ToolArgs;
use ward_protocol::ToolCall;
use ward_protocol::ToolResult;

use crate::outcome::HookFailure;
use crate::outcome::PostOutcome;
use crate::outcome::PreOutcome;

/// A hook that runs before the tool handler.
#[async_trait]
pub trait PreHook<C>: Send + Sync {
    /// Stable hook name, used in logs and synthesized errors.
    fn name(&self) -> &str;

    /// Tools this hook applies to. `None` matches every tool.
    fn tool_filter(&self) -> Option<&[&str]> {
        None
    }

    async fn run(&self, ctx: &C, call: &ToolCall) -> Result<PreOutcome, HookFailure>;
}

/// A hook that runs after the tool handler.
#[async_trait]
pub trait PostHook<C>: Send + Sync {
    fn name(&self) -> &str;

    fn tool_filter(&self) -> Option<&[&str]> {
        None
    }

    async fn run(
        &self,
        ctx: &C,
        call: &ToolCall,
        result: &ToolResult,
    ) -> Result<PostOutcome, HookFailure>;
}

fn filter_matches(filter: Option<&[&str]>, tool: &str) -> bool {
    match filter {
        Some(names) => names.contains(&tool),
        None => true,
    }
}

/// Aggregate result of the pre-hook chain.
#[derive(Debug, Default)]
pub struct PreDispatch {
    pub proceed: bool,

    /// Structured envelope from the vetoing hook, if it produced one.
    pub error: Option<GateError>,

    /// Synthesized message when the veto came from an internal hook
    /// failure rather than a policy decision.
    pub failure_message: Option<String>,

    /// Name of the hook that vetoed, for diagnostics.
    pub vetoed_by: Option<String>,

    /// Concatenated injected context from all hooks that ran.
    pub injected_context: Option<String>,

    /// Final argument rewrite (last writer wins).
    pub modified_args: Option<ToolArgs>,
}

impl PreDispatch {
    fn allowed() -> Self {
        Self {
            proceed: true,
            ..Self::default()
        }
    }

    /// The error content to hand back to the model on a veto: the
    /// structured envelope when present, the synthesized message
    /// otherwise.
    pub fn error_content(&self) -> Option<String> {
        if let Some(err) = &self.error {
            return Some(err.to_json_string());
        }
        self.failure_message.clone()
    }
}

/// Outcome of one post hook, labeled with the hook's name.
#[derive(Debug)]
pub struct PostDispatchEntry {
    pub hook: String,
    pub outcome: PostOutcome,
}

/// Ordered hook registry. Stateless: sessions own all mutable state.
pub struct HookEngine<C> {
    pre: Vec<Arc<dyn PreHook<C>>>,
    post: Vec<Arc<dyn PostHook<C>>>,
}

impl<C: Send + Sync> Default for HookEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync> HookEngine<C> {
    pub fn new() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    /// Register a pre hook. Order of registration is order of execution.
    pub fn register_pre(&mut self, hook: Arc<dyn PreHook<C>>) {
        tracing::debug!(hook = hook.name(), "registered pre hook");
        self.pre.push(hook);
    }

    /// Register a post hook. Order of registration is order of execution.
    pub fn register_post(&mut self, hook: Arc<dyn PostHook<C>>) {
        tracing::debug!(hook = hook.name(), "registered post hook");
        self.post.push(hook);
    }

    /// Run all matching pre hooks in order, short-circuiting on the
    /// first veto.
    pub async fn execute_pre(&self, ctx: &C, call: &ToolCall) -> PreDispatch {
        let mut dispatch = PreDispatch::allowed();
        // Later hooks see earlier rewrites.
        let mut effective = call.clone();

        for hook in &self.pre {
            if !filter_matches(hook.tool_filter(), &call.name) {
                continue;
            }

            tracing::debug!(hook = hook.name(), tool = %call.name, "running pre hook");
            match hook.run(ctx, &effective).await {
                Ok(outcome) => {
                    if let Some(context) = outcome.injected_context {
                        dispatch.injected_context = Some(match dispatch.injected_context.take() {
                            Some(existing) => format!("{existing}\n{context}"),
                            None => context,
                        });
                    }
                    if let Some(args) = outcome.modified_args {
                        effective.args = args.clone();
                        dispatch.modified_args = Some(args);
                    }
                    if !outcome.proceed {
                        tracing::info!(
                            hook = hook.name(),
                            tool = %call.name,
                            "pre hook vetoed tool call"
                        );
                        dispatch.proceed = false;
                        dispatch.error = outcome.error;
                        dispatch.vetoed_by = Some(hook.name().to_string());
                        return dispatch;
                    }
                }
                Err(failure) => {
                    tracing::warn!(
                        hook = hook.name(),
                        tool = %call.name,
                        error = %failure,
                        "pre hook failed; treating as veto"
                    );
                    dispatch.proceed = false;
                    dispatch.failure_message = Some(failure.to_string());
                    dispatch.vetoed_by = Some(hook.name().to_string());
                    return dispatch;
                }
            }
        }

        dispatch
    }

    /// Run all matching post hooks unconditionally, collecting outcomes.
    pub async fn execute_post(
        &self,
        ctx: &C,
        call: &ToolCall,
        result: &ToolResult,
    ) -> Vec<PostDispatchEntry> {
        let mut entries = Vec::new();

        for hook in &self.post {
            if !filter_matches(hook.tool_filter(), &call.name) {
                continue;
            }

            tracing::debug!(hook = hook.name(), tool = %call.name, "running post hook");
            let outcome = match hook.run(ctx, call, result).await {
                Ok(outcome) => {
                    if let Some(error) = &outcome.error {
                        tracing::warn!(
                            hook = hook.name(),
                            tool = %call.name,
                            error,
                            "post hook reported failure"
                        );
                    }
                    outcome
                }
                Err(failure) => {
                    tracing::warn!(
                        hook = hook.name(),
                        tool = %call.name,
                        error = %failure,
                        "post hook failed"
                    );
                    PostOutcome::failed(failure.to_string())
                }
            };

            entries.push(PostDispatchEntry {
                hook: hook.name().to_string(),
                outcome,
            });
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use ward_protocol::GateCode;
    use ward_protocol::GateErrorKind;

    struct Noop;

    #[derive(Default)]
    struct Recorder {
        ran: AtomicUsize,
    }

    struct CountingPre<'a> {
        name: &'static str,
        veto: bool,
        fail: bool,
        context: Option<&'static str>,
        recorder: &'a Recorder,
    }

    #[async_trait]
    impl PreHook<Noop> for CountingPre<'_> {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, _ctx: &Noop, call: &ToolCall) -> Result<PreOutcome, HookFailure> {
            self.recorder.ran.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HookFailure::new(self.name, "boom"));
            }
            if self.veto {
                return Ok(PreOutcome::veto(GateError::new(
                    GateErrorKind::ScopeViolation,
                    GateCode::Req001,
                    call.name.clone(),
                    "denied",
                )));
            }
            let mut outcome = PreOutcome::proceed();
            if let Some(context) = self.context {
                outcome = outcome.with_context(context);
            }
            Ok(outcome)
        }
    }

    fn call() -> ToolCall {
        ToolCall::new("call-1", "write_file", json!({"path": "a", "body": "b"}))
    }

    #[tokio::test]
    async fn pre_hooks_short_circuit_on_veto() {
        let recorder = Recorder::default();
        // Hooks borrow the recorder, so build the engine in a scope.
        let mut engine: HookEngine<Noop> = HookEngine::new();
        let r: &'static Recorder = Box::leak(Box::new(recorder));
        engine.register_pre(Arc::new(CountingPre {
            name: "first",
            veto: false,
            fail: false,
            context: None,
            recorder: r,
        }));
        engine.register_pre(Arc::new(CountingPre {
            name: "vetoer",
            veto: true,
            fail: false,
            context: None,
            recorder: r,
        }));
        engine.register_pre(Arc::new(CountingPre {
            name: "never",
            veto: false,
            fail: false,
            context: None,
            recorder: r,
        }));

        let dispatch = engine.execute_pre(&Noop, &call()).await;
        assert!(!dispatch.proceed);
        assert_eq!(dispatch.vetoed_by.as_deref(), Some("vetoer"));
        assert_eq!(r.ran.load(Ordering::SeqCst), 2);

        let content = dispatch.error_content().unwrap();
        assert!(content.contains("\"code\":\"REQ-001\""));
    }

    #[tokio::test]
    async fn injected_context_concatenates() {
        let r: &'static Recorder = Box::leak(Box::default());
        let mut engine: HookEngine<Noop> = HookEngine::new();
        engine.register_pre(Arc::new(CountingPre {
            name: "a",
            veto: false,
            fail: false,
            context: Some("alpha"),
            recorder: r,
        }));
        engine.register_pre(Arc::new(CountingPre {
            name: "b",
            veto: false,
            fail: false,
            context: Some("beta"),
            recorder: r,
        }));

        let dispatch = engine.execute_pre(&Noop, &call()).await;
        assert!(dispatch.proceed);
        assert_eq!(dispatch.injected_context.as_deref(), Some("alpha\nbeta"));
    }

    #[tokio::test]
    async fn hook_failure_is_a_veto_with_synthesized_message() {
        let r: &'static Recorder = Box::leak(Box::default());
        let mut engine: HookEngine<Noop> = HookEngine::new();
        engine.register_pre(Arc::new(CountingPre {
            name: "broken",
            veto: false,
            fail: true,
            context: None,
            recorder: r,
        }));

        let dispatch = engine.execute_pre(&Noop, &call()).await;
        assert!(!dispatch.proceed);
        assert!(dispatch.error.is_none());
        assert_eq!(
            dispatch.error_content().unwrap(),
            "hook 'broken' failed: boom"
        );
    }

    struct FilteredPre;

    #[async_trait]
    impl PreHook<Noop> for FilteredPre {
        fn name(&self) -> &str {
            "filtered"
        }

        fn tool_filter(&self) -> Option<&[&str]> {
            Some(&["execute_command"])
        }

        async fn run(&self, _ctx: &Noop, _call: &ToolCall) -> Result<PreOutcome, HookFailure> {
            Err(HookFailure::new("filtered", "should not run"))
        }
    }

    #[tokio::test]
    async fn tool_filter_skips_non_matching_tools() {
        let mut engine: HookEngine<Noop> = HookEngine::new();
        engine.register_pre(Arc::new(FilteredPre));

        let dispatch = engine.execute_pre(&Noop, &call()).await;
        assert!(dispatch.proceed);
    }

    struct FailingPost;

    #[async_trait]
    impl PostHook<Noop> for FailingPost {
        fn name(&self) -> &str {
            "failing_post"
        }

        async fn run(
            &self,
            _ctx: &Noop,
            _call: &ToolCall,
            _result: &ToolResult,
        ) -> Result<PostOutcome, HookFailure> {
            Err(HookFailure::new("failing_post", "disk full"))
        }
    }

    struct OkPost;

    #[async_trait]
    impl PostHook<Noop> for OkPost {
        fn name(&self) -> &str {
            "ok_post"
        }

        async fn run(
            &self,
            _ctx: &Noop,
            _call: &ToolCall,
            _result: &ToolResult,
        ) -> Result<PostOutcome, HookFailure> {
            Ok(PostOutcome::ok_with("audited"))
        }
    }

    #[tokio::test]
    async fn post_hooks_all_run_despite_failures() {
        let mut engine: HookEngine<Noop> = HookEngine::new();
        engine.register_post(Arc::new(FailingPost));
        engine.register_post(Arc::new(OkPost));

        let entries = engine
            .execute_post(&Noop, &call(), &ToolResult::ok("done"))
            .await;
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].outcome.success);
        assert!(entries[1].outcome.success);
        assert_eq!(entries[1].outcome.side_effects.as_deref(), Some("audited"));
    }
}
