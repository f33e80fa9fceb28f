//! The Scope Enforcement Gate.
//!
//! The central policy pre-hook. For every non-partial tool call it walks
//! a fixed sequence of checks: active-intent requirement, ignore-list
//! bypass, user-intent preflight, the command branch, stale blocks,
//! metadata injection, destructive-operation preflight, unknown-target
//! and scope checks. Every overridable check funnels through HITL; every
//! prompt result is appended to the decision ledger and cached
//! in-session.

pub mod paths;
pub mod scope;

use async_trait::async_trait;
use chrono::SecondsFormat;
use chrono::Utc;
use serde_json::json;
use tracing::debug;
use ward_hooks::HookFailure;
use ward_hooks::PreHook;
use ward_hooks::PreOutcome;
use ward_protocol::Decision;
use ward_protocol::DecisionVerdict;
use ward_protocol::GateCode;
use ward_protocol::GateError;
use ward_protocol::GateErrorKind;
use ward_protocol::MutationClass;
use ward_protocol::ToolCall;
use ward_protocol::UserIntentClassification;
use ward_protocol::tool_call::tool_names;

use crate::classify::command::CommandClass;
use crate::classify::command::CommandPolicy;
use crate::classify::command::classify_command_debug;
use crate::classify::command::unwrap_shell_wrapper;
use crate::classify::user_intent::classify_user_message;
use crate::hitl::HitlPrompt;
use crate::intent::ignore::is_intent_ignored;
use crate::session::Session;
use crate::session::command_key;

use self::paths::destructive_patch_summary;
use self::paths::extract_target_paths;
use self::paths::patch_is_destructive;

pub struct ScopeGateHook;

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Everything a decision record needs besides the verdict.
struct DecisionSeed {
    intent_id: Option<String>,
    tool: String,
    reason: String,
    targets: Option<Vec<String>>,
    command: Option<String>,
    command_classification: Option<String>,
    intent_classification: Option<String>,
}

impl DecisionSeed {
    fn new(intent_id: Option<&str>, tool: &str, reason: &str) -> Self {
        Self {
            intent_id: intent_id.map(str::to_string),
            tool: tool.to_string(),
            reason: reason.to_string(),
            targets: None,
            command: None,
            command_classification: None,
            intent_classification: None,
        }
    }

    fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = Some(targets);
        self
    }

    fn with_command(mut self, command: &str, classification: &str) -> Self {
        self.command = Some(command.to_string());
        self.command_classification = Some(classification.to_string());
        self
    }

    fn with_intent_classification(mut self, classification: &str) -> Self {
        self.intent_classification = Some(classification.to_string());
        self
    }

    fn into_decision(self, approved: bool) -> Decision {
        Decision {
            intent_id: self.intent_id,
            tool: self.tool,
            decision: if approved {
                DecisionVerdict::Approved
            } else {
                DecisionVerdict::Rejected
            },
            reason: self.reason,
            targets: self.targets,
            command: self.command,
            command_classification: self.command_classification,
            intent_classification: self.intent_classification,
            timestamp: now_iso(),
        }
    }
}

/// Append a decision to the ledger; failures are logged, never fatal.
async fn record_decision(session: &Session, decision: &Decision) {
    if let Err(err) =
        ward_utils_lockfile::append_jsonl(&session.paths.decisions_file(), decision).await
    {
        tracing::warn!(error = %err, "failed to persist HITL decision");
    }
    session
        .diagnostics
        .emit(
            "hitl_decision",
            json!({
                "tool": decision.tool,
                "reason": decision.reason,
                "decision": decision.decision,
            }),
        )
        .await;
}

/// Prompt the human, record the decision, and cache it under
/// `cache_key`. A cached answer short-circuits the prompt entirely.
async fn prompt_cached(
    session: &Session,
    cache_key: &str,
    prompt: HitlPrompt,
    seed: DecisionSeed,
) -> bool {
    if let Some(cached) = session.state.lock().await.cached_decision(cache_key) {
        debug!(cache_key, cached, "reusing in-session HITL decision");
        return cached;
    }

    let approved = session.hitl.confirm(&prompt).await;
    record_decision(session, &seed.into_decision(approved)).await;
    session
        .state
        .lock()
        .await
        .cache_decision(cache_key.to_string(), approved);
    approved
}

/// Classify the session's last user message, memoized per message hash.
async fn classify_message_cached(session: &Session) -> Option<UserIntentClassification> {
    let message = {
        let state = session.state.lock().await;
        state.last_user_message().map(str::to_string)
    };
    let message = message?;

    let hash = crate::sha256_hex(message.as_bytes());
    if let Some(cached) = session.state.lock().await.cached_user_intent(&hash) {
        return Some(cached.clone());
    }

    let classification =
        classify_user_message(Some(&message), session.classifier.as_deref()).await;
    session
        .state
        .lock()
        .await
        .cache_user_intent(classification.clone());
    Some(classification)
}

impl ScopeGateHook {
    /// The command-execution branch (step 5). Ends the gate either way.
    async fn gate_command(
        &self,
        session: &Session,
        call: &ToolCall,
        active_id: Option<&str>,
    ) -> PreOutcome {
        let tool = call.name.as_str();
        let Some(command) = call.args.command() else {
            return PreOutcome::proceed();
        };
        let command = command.trim();
        if command.is_empty() {
            return PreOutcome::proceed();
        }

        let inner = unwrap_shell_wrapper(command).to_string();
        let policy = CommandPolicy::load(&session.paths);
        let mut branches = Vec::new();
        let class = classify_command_debug(&inner, &policy, &mut |line| branches.push(line));
        for branch in branches {
            session
                .diagnostics
                .emit(
                    "command_classified",
                    json!({"command": inner.as_str(), "branch": branch}),
                )
                .await;
        }

        let key = command_key(active_id, &inner);
        match class {
            CommandClass::Safe => {
                session.state.lock().await.approve_command(key);
                record_decision(
                    session,
                    &DecisionSeed::new(active_id, tool, "safe_command")
                        .with_command(&inner, class.as_str())
                        .into_decision(true),
                )
                .await;
                PreOutcome::proceed()
            }
            CommandClass::Destructive => {
                if session.state.lock().await.is_command_approved(&key) {
                    debug!(command = %inner, "command approved earlier this session");
                    return PreOutcome::proceed();
                }

                // A persisted approval of the same (tool, command,
                // intent) from any session is honored without
                // re-prompting.
                let persisted: Vec<Decision> =
                    ward_utils_lockfile::read_jsonl_tolerant(&session.paths.decisions_file());
                if persisted
                    .iter()
                    .any(|d| d.covers_command(tool, &inner, active_id))
                {
                    debug!(command = %inner, "command approved by persisted decision");
                    session.state.lock().await.approve_command(key);
                    return PreOutcome::proceed();
                }

                let prompt = HitlPrompt::new(
                    "Destructive command",
                    format!("Allow the agent to run `{inner}`?"),
                    "destructive_command",
                );
                let approved = session.hitl.confirm(&prompt).await;
                record_decision(
                    session,
                    &DecisionSeed::new(active_id, tool, "destructive_command")
                        .with_command(&inner, class.as_str())
                        .into_decision(approved),
                )
                .await;

                if approved {
                    session.state.lock().await.approve_command(key);
                    return PreOutcome::proceed();
                }

                let mut err = GateError::new(
                    GateErrorKind::CommandNotAuthorized,
                    GateCode::Cmd001,
                    tool,
                    format!("command `{inner}` was not authorized"),
                )
                .with_command(inner);
                if let Some(id) = active_id {
                    err = err.with_intent(id);
                }
                PreOutcome::veto(err)
            }
        }
    }
}

#[async_trait]
impl PreHook<Session> for ScopeGateHook {
    fn name(&self) -> &str {
        "scope_enforcement"
    }

    async fn run(&self, session: &Session, call: &ToolCall) -> Result<PreOutcome, HookFailure> {
        // 1. Pass-through for partial calls and the selection tool.
        if call.partial || call.name == tool_names::SELECT_ACTIVE_INTENT {
            return Ok(PreOutcome::proceed());
        }

        let tool = call.name.as_str();
        let is_command_tool = tool == tool_names::EXECUTE_COMMAND;
        let is_destructive_tool = session.tools.is_destructive(tool);

        // 2. Destructive tools require an active intent.
        let active = {
            let state = session.state.lock().await;
            state
                .active_intent()
                .map(|a| (a.id.clone(), a.intent.clone()))
        };
        if is_destructive_tool && active.is_none() {
            return Ok(PreOutcome::veto(GateError::new(
                GateErrorKind::NoActiveIntent,
                GateCode::Req003,
                tool,
                "no active intent; call select_active_intent before mutating the workspace",
            )));
        }

        // 3. Ignore-listed intents bypass everything else.
        if let Some((active_id, _)) = &active {
            if is_intent_ignored(&session.paths.ignore_file(), active_id) {
                debug!(intent = %active_id, "intent is ignore-listed; bypassing gate");
                return Ok(PreOutcome::proceed());
            }
        }

        // 4. User-intent preflight for non-destructive, non-command
        // tools: a destructive user request gates even read-shaped
        // tools.
        if !is_destructive_tool && !is_command_tool {
            if let Some(classification) = classify_message_cached(session).await {
                if classification.is_destructive() {
                    let targets = extract_target_paths(&call.args);
                    let cache_key = format!(
                        "user_intent|{}|{}:{}",
                        classification.message_hash,
                        tool,
                        targets.join(",")
                    );
                    let reason = classification
                        .reason
                        .clone()
                        .unwrap_or_else(|| "no reason given".to_string());
                    let approved = prompt_cached(
                        session,
                        &cache_key,
                        HitlPrompt::new(
                            "Destructive request",
                            format!(
                                "The user's message was classified destructive ({reason}). Allow `{tool}` to proceed?"
                            ),
                            "destructive_intent",
                        ),
                        DecisionSeed::new(
                            active.as_ref().map(|(id, _)| id.as_str()),
                            tool,
                            "destructive_intent",
                        )
                        .with_targets(targets.clone())
                        .with_intent_classification(classification.verdict.as_str()),
                    )
                    .await;

                    if !approved {
                        let mut err = GateError::new(
                            GateErrorKind::DestructiveIntentDenied,
                            GateCode::Req009,
                            tool,
                            "the destructive user request was denied",
                        )
                        .with_targets(targets);
                        if let Some((id, _)) = &active {
                            err = err.with_intent(id.clone());
                        }
                        return Ok(PreOutcome::veto(err));
                    }
                }
            }
            // Nothing else gates non-destructive tools.
            return Ok(PreOutcome::proceed());
        }

        // 5. The command branch ends here either way.
        if is_command_tool {
            return Ok(self
                .gate_command(session, call, active.as_ref().map(|(id, _)| id.as_str()))
                .await);
        }

        // Mutating tools from here on; step 2 guaranteed an intent.
        let Some((active_id, intent)) = active else {
            return Ok(PreOutcome::veto(GateError::new(
                GateErrorKind::NoActiveIntent,
                GateCode::Req003,
                tool,
                "no active intent",
            )));
        };

        let mut targets: Vec<String> = Vec::new();
        for raw in extract_target_paths(&call.args) {
            let normalized = session.normalize(&raw);
            if !normalized.is_empty() && !targets.contains(&normalized) {
                targets.push(normalized);
            }
        }

        // 6. Stale-blocked paths need an explicit override.
        for path in &targets {
            let blocked = session.state.lock().await.stale_block(path).is_some();
            if !blocked {
                continue;
            }
            let cache_key = format!("stale_override|{path}");
            let approved = prompt_cached(
                session,
                &cache_key,
                HitlPrompt::new(
                    "Stale file",
                    format!(
                        "`{path}` changed outside this session and is blocked. Override and continue?"
                    ),
                    "stale_override",
                ),
                DecisionSeed::new(Some(&active_id), tool, "stale_override")
                    .with_targets(vec![path.clone()]),
            )
            .await;

            if !approved {
                return Ok(PreOutcome::veto(
                    GateError::new(
                        GateErrorKind::StaleLock,
                        GateCode::Req007,
                        tool,
                        format!("`{path}` is stale-blocked; re-read it before mutating"),
                    )
                    .with_path(path.clone())
                    .with_intent(active_id),
                ));
            }
            session.state.lock().await.clear_stale_block(path);
        }

        // 7. Provenance metadata: inject defaults, then enforce.
        let mut args = call.args.clone();
        match args.intent_id() {
            None => args.set_intent_id(&active_id),
            Some(declared) if declared != active_id => {
                let declared = declared.to_string();
                return Ok(PreOutcome::veto(
                    GateError::new(
                        GateErrorKind::IntentMismatch,
                        GateCode::Req004,
                        tool,
                        format!(
                            "declared intent '{declared}' does not match the active intent '{active_id}'"
                        ),
                    )
                    .with_provided_intent_id(declared)
                    .with_intent(active_id),
                ));
            }
            Some(_) => {}
        }
        match args.mutation_class_raw() {
            None => args.set_mutation_class(MutationClass::IntentEvolution),
            Some(raw) if MutationClass::parse(raw).is_none() => {
                let raw = raw.to_string();
                return Ok(PreOutcome::veto(
                    GateError::new(
                        GateErrorKind::InvalidMetadata,
                        GateCode::Req005,
                        tool,
                        format!(
                            "mutation_class '{raw}' is not one of AST_REFACTOR, INTENT_EVOLUTION"
                        ),
                    )
                    .with_mutation_class(raw)
                    .with_intent(active_id),
                ));
            }
            Some(_) => {}
        }

        // 8. Destructive-operation preflight: deletion/move markers in
        // the payload, or a destructive user message, prompt regardless
        // of scope.
        let patch_destructive = call
            .args
            .patch_body()
            .map(patch_is_destructive)
            .unwrap_or(false);
        let user_classification = classify_message_cached(session).await;
        let user_destructive = user_classification
            .as_ref()
            .map(|c| c.is_destructive())
            .unwrap_or(false);

        if patch_destructive || user_destructive {
            let summary = if patch_destructive {
                call.args
                    .patch_body()
                    .map(destructive_patch_summary)
                    .unwrap_or_default()
                    .join("; ")
            } else {
                "user message classified destructive".to_string()
            };
            let approval_key = format!("destructive_op|{tool}|{}", targets.join(","));
            let already = session
                .state
                .lock()
                .await
                .is_destructive_approved(&approval_key);

            if !already {
                let mut seed = DecisionSeed::new(Some(&active_id), tool, "destructive_operation")
                    .with_targets(targets.clone());
                if let Some(c) = &user_classification {
                    seed = seed.with_intent_classification(c.verdict.as_str());
                }
                let approved = session
                    .hitl
                    .confirm(&HitlPrompt::new(
                        "Destructive operation",
                        format!("This call performs a destructive operation: {summary}. Continue?"),
                        "destructive_operation",
                    ))
                    .await;
                record_decision(session, &seed.into_decision(approved)).await;

                if !approved {
                    return Ok(PreOutcome::veto(
                        GateError::new(
                            GateErrorKind::DestructiveOperationDenied,
                            GateCode::Req008,
                            tool,
                            "the destructive operation was denied",
                        )
                        .with_targets(targets)
                        .with_intent(active_id),
                    ));
                }
                session
                    .state
                    .lock()
                    .await
                    .approve_destructive(approval_key);
            }
        }

        // 9. A mutating call with no extractable targets is suspicious.
        if targets.is_empty() {
            let approved = prompt_cached(
                session,
                &format!("unknown_targets|{tool}|{}", call.id),
                HitlPrompt::new(
                    "Unknown targets",
                    format!("`{tool}` mutates the workspace but names no paths. Continue?"),
                    "unknown_targets",
                ),
                DecisionSeed::new(Some(&active_id), tool, "unknown_targets"),
            )
            .await;

            if !approved {
                return Ok(PreOutcome::veto(
                    GateError::new(
                        GateErrorKind::UnknownTargets,
                        GateCode::Req002,
                        tool,
                        "no target paths could be extracted from the call",
                    )
                    .with_intent(active_id),
                ));
            }
            return Ok(PreOutcome::proceed().with_args(args));
        }

        // 10. Scope: every target must fall inside the owned scope.
        let scope: Vec<String> = intent
            .owned_scope
            .iter()
            .map(|entry| {
                if scope::has_glob_meta(entry) {
                    entry.clone()
                } else {
                    session.normalize(entry)
                }
            })
            .collect();

        for path in &targets {
            if scope::path_in_scope(path, &scope) {
                continue;
            }
            let cache_key = format!("scope|{active_id}|{path}");
            let approved = prompt_cached(
                session,
                &cache_key,
                HitlPrompt::new(
                    "Out-of-scope write",
                    format!(
                        "`{path}` is outside the owned scope of intent '{active_id}'. Allow this write?"
                    ),
                    "scope_violation",
                ),
                DecisionSeed::new(Some(&active_id), tool, "scope_violation")
                    .with_targets(vec![path.clone()]),
            )
            .await;

            if !approved {
                session
                    .diagnostics
                    .emit(
                        "gate_veto",
                        json!({"code": "REQ-001", "tool": tool, "filename": path}),
                    )
                    .await;
                return Ok(PreOutcome::veto(
                    GateError::new(
                        GateErrorKind::ScopeViolation,
                        GateCode::Req001,
                        tool,
                        format!("`{path}` is outside the owned scope of the active intent"),
                    )
                    .with_filename(path.clone())
                    .with_intent(active_id),
                ));
            }
        }

        Ok(PreOutcome::proceed().with_args(args))
    }
}
