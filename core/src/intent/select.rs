//! The intent-selection handshake.
//!
//! `select_active_intent(intent_id)` is the first governed call of any
//! session that wants to mutate. This pre-hook loads the registry,
//! validates the id and status, assembles the context block, and binds
//! the result to the session. The matching tool handler just echoes the
//! block back to the model.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use ward_hooks::HookFailure;
use ward_hooks::PreHook;
use ward_hooks::PreOutcome;
use ward_protocol::GateCode;
use ward_protocol::GateError;
use ward_protocol::GateErrorKind;
use ward_protocol::TraceEntry;
use ward_protocol::tool_call::tool_names;
use ward_protocol::ToolCall;

use crate::intent::context::render_context_block;
use crate::intent::store;
use crate::intent::store::StoreError;
use crate::session::ActiveIntent;
use crate::session::Session;

pub struct SelectIntentHook;

impl SelectIntentHook {
    fn veto(kind: GateErrorKind, message: String) -> PreOutcome {
        PreOutcome::veto(GateError::new(
            kind,
            GateCode::HookInt001,
            tool_names::SELECT_ACTIVE_INTENT,
            message,
        ))
    }
}

#[async_trait]
impl PreHook<Session> for SelectIntentHook {
    fn name(&self) -> &str {
        "intent_selection"
    }

    fn tool_filter(&self) -> Option<&[&str]> {
        Some(&[tool_names::SELECT_ACTIVE_INTENT])
    }

    async fn run(&self, session: &Session, call: &ToolCall) -> Result<PreOutcome, HookFailure> {
        if call.partial {
            return Ok(PreOutcome::proceed());
        }

        let intents = match store::load_intents(&session.paths.intents_file()) {
            Ok(intents) => intents,
            Err(StoreError::Unreadable { path, source }) => {
                return Ok(Self::veto(
                    GateErrorKind::AccessDenied,
                    format!("could not read intents file {path}: {source}"),
                ));
            }
            Err(StoreError::Unparseable { path, message }) => {
                return Ok(Self::veto(
                    GateErrorKind::ParseError,
                    format!("could not parse intents file {path}: {message}"),
                ));
            }
        };

        let requested = call.args.intent_id().map(str::to_string);
        let intent = match requested {
            Some(id) => match intents.find(&id) {
                Some(intent) => intent.clone(),
                None => {
                    return Ok(Self::veto(
                        GateErrorKind::MissingIntent,
                        format!("no intent with id '{id}' is registered"),
                    ));
                }
            },
            None => {
                // Soft fallback: a single IN_PROGRESS intent selects
                // itself.
                let mut in_progress = intents.in_progress();
                match (in_progress.next(), in_progress.next()) {
                    (Some(only), None) => only.clone(),
                    _ => {
                        return Ok(Self::veto(
                            GateErrorKind::MissingIntent,
                            "intent_id is required when more than one intent is IN_PROGRESS"
                                .to_string(),
                        ));
                    }
                }
            }
        };

        if !intent.is_selectable() {
            return Ok(Self::veto(
                GateErrorKind::InvalidMetadata,
                format!(
                    "intent '{}' has status {}; only IN_PROGRESS intents may be selected",
                    intent.id,
                    intent.status.as_str()
                ),
            ));
        }

        // Brief history: the last entries whose conversations (or
        // top-level intent_id) link to this intent.
        let all_entries: Vec<TraceEntry> =
            ward_utils_lockfile::read_jsonl_tolerant(&session.paths.trace_file());
        let history: Vec<TraceEntry> = all_entries
            .into_iter()
            .filter(|e| e.relates_to_intent(&intent.id))
            .collect();

        let knowledge = std::fs::read_to_string(session.paths.knowledge_file()).ok();

        let block = render_context_block(&intent, &history, knowledge.as_deref());

        let mut state = session.state.lock().await;
        state.set_active_intent(ActiveIntent {
            id: intent.id.clone(),
            selected_at: Utc::now(),
            context_block: block.clone(),
            intent,
        });
        let intent_id = state
            .active_intent()
            .map(|a| a.id.clone())
            .unwrap_or_default();
        drop(state);

        info!(session = %session.id, intent = %intent_id, "active intent selected");
        session
            .diagnostics
            .emit(
                "intent_selected",
                serde_json::json!({ "intent_id": intent_id }),
            )
            .await;

        Ok(PreOutcome::proceed().with_context(block))
    }
}
