//! End-to-end pipeline scenarios.
//!
//! Each test drives the full dispatch loop (pre hooks, handler, post
//! hooks) against a real temp workspace, the way a host would.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use ward_core::Driver;
use ward_core::Session;
use ward_core::hitl::DenyAll;
use ward_core::hitl::Scripted;
use ward_core::sha256_hex;
use ward_hooks::HookFailure;
use ward_hooks::PreHook;
use ward_hooks::PreOutcome;
use ward_protocol::Decision;
use ward_protocol::ToolCall;
use ward_protocol::TraceEntry;

const REGISTRY: &str = r#"
active_intents:
  - id: INT-1
    name: Governed work
    status: IN_PROGRESS
    owned_scope:
      - src
    constraints:
      - Stay inside src
    acceptance_criteria:
      - Writes are traced
"#;

fn seed_registry(cwd: &Path) {
    let ward = cwd.join(".ward");
    std::fs::create_dir_all(&ward).unwrap();
    std::fs::write(ward.join("active_intents.yaml"), REGISTRY).unwrap();
}

fn select_call() -> ToolCall {
    ToolCall::new("call-select", "select_active_intent", json!({"intent_id": "INT-1"}))
}

fn write_call(id: &str, path: &str, body: &str) -> ToolCall {
    ToolCall::new(id, "write_file", json!({"path": path, "body": body}))
}

async fn select_intent(driver: &Driver, session: &Session) {
    let outcome = driver.dispatch(session, &select_call()).await;
    assert!(outcome.result.success, "selection failed: {:?}", outcome.result);
    assert!(
        outcome
            .injected_context
            .as_deref()
            .unwrap_or_default()
            .contains("<intent_context>")
    );
}

fn read_trace(session: &Session) -> Vec<TraceEntry> {
    ward_utils_lockfile::read_jsonl_tolerant(&session.paths.trace_file())
}

fn read_decisions(session: &Session) -> Vec<Decision> {
    ward_utils_lockfile::read_jsonl_tolerant(&session.paths.decisions_file())
}

// Scenario 1: happy write inside scope, metadata injected, trace
// appended with whole-file and range hashes.
#[tokio::test]
async fn happy_write_is_traced_with_hashes() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let outcome = driver.dispatch(&session, &write_call("call-1", "src/a.ts", "x")).await;
    assert!(outcome.result.success, "{:?}", outcome.result);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
        "x"
    );

    let trace = read_trace(&session);
    assert_eq!(trace.len(), 1);
    let entry = &trace[0];
    assert_eq!(entry.intent_id.as_deref(), Some("INT-1"));
    assert_eq!(entry.tool, "write_file");
    assert_eq!(entry.tool_use_id, "call-1");
    // Metadata was injected by the gate, not supplied by the caller.
    assert_eq!(entry.params["intent_id"], json!("INT-1"));
    assert_eq!(entry.params["mutation_class"], json!("INTENT_EVOLUTION"));

    assert_eq!(entry.files.len(), 1);
    let file = &entry.files[0];
    assert_eq!(file.relative_path, "src/a.ts");
    assert_eq!(file.content_hash, sha256_hex(b"x"));
    let ranges = &file.conversations[0].ranges;
    assert_eq!(ranges.len(), 1);
    assert_eq!((ranges[0].start_line, ranges[0].end_line), (1, 1));
    assert_eq!(ranges[0].content_hash, sha256_hex(b"x"));
}

// Scenario 2: out-of-scope write, HITL denied.
#[tokio::test]
async fn out_of_scope_denial_blocks_write_and_trace() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let hitl = Arc::new(Scripted::new([false]));
    let session = Session::new("s-1", dir.path()).with_hitl(hitl.clone());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let outcome = driver.dispatch(&session, &write_call("call-1", "other/a.ts", "x")).await;
    assert!(!outcome.result.success);
    assert_eq!(outcome.vetoed_by.as_deref(), Some("scope_enforcement"));

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "scope_violation");
    assert_eq!(err["code"], "REQ-001");
    assert_eq!(err["intent_id"], "INT-1");
    assert_eq!(err["filename"], "other/a.ts");

    assert!(!dir.path().join("other/a.ts").exists());
    assert!(read_trace(&session).is_empty());
    assert_eq!(hitl.prompt_count(), 1);

    // The rejection is on the decision ledger.
    let decisions = read_decisions(&session);
    assert!(decisions.iter().any(|d| d.reason == "scope_violation" && !d.approved()));
}

/// Simulates a sibling process rewriting a file after the snapshot was
/// taken but before the handler writes.
struct SiblingRewrite {
    path: std::path::PathBuf,
    content: &'static str,
    done: AtomicBool,
}

#[async_trait]
impl PreHook<Session> for SiblingRewrite {
    fn name(&self) -> &str {
        "sibling_rewrite"
    }

    fn tool_filter(&self) -> Option<&[&str]> {
        Some(&["write_file"])
    }

    async fn run(&self, _session: &Session, _call: &ToolCall) -> Result<PreOutcome, HookFailure> {
        if !self.done.swap(true, Ordering::SeqCst) {
            std::fs::write(&self.path, self.content)
                .map_err(|e| HookFailure::new(self.name(), e.to_string()))?;
        }
        Ok(PreOutcome::proceed())
    }
}

// Scenario 3: the optimistic lock catches a concurrent rewrite; the
// write is aborted and the failure reaches the shared knowledge file.
#[tokio::test]
async fn optimistic_lock_blocks_stale_write() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/a.ts"), "A").unwrap();

    let session = Session::new("s-1", dir.path());

    // Standard pipeline, plus an interference hook after the snapshot.
    let mut driver = Driver::bare();
    driver
        .engine_mut()
        .register_pre(Arc::new(ward_core::intent::SelectIntentHook));
    driver
        .engine_mut()
        .register_pre(Arc::new(ward_core::gate::ScopeGateHook));
    driver
        .engine_mut()
        .register_pre(Arc::new(ward_core::snapshot::SnapshotHook));
    driver.engine_mut().register_pre(Arc::new(SiblingRewrite {
        path: dir.path().join("src/a.ts"),
        content: "B",
        done: AtomicBool::new(false),
    }));
    driver
        .engine_mut()
        .register_post(Arc::new(ward_core::trace::TraceWriterHook));
    driver
        .engine_mut()
        .register_post(Arc::new(ward_core::knowledge::LessonsLearnedHook));
    *driver.registry_mut() = ward_core::tools::ToolRegistry::default();

    select_intent(&driver, &session).await;

    let outcome = driver.dispatch(&session, &write_call("call-1", "src/a.ts", "C")).await;
    assert!(!outcome.result.success);

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "stale_file");
    assert_eq!(err["code"], "REQ-007");
    assert_eq!(err["expected_hash"], sha256_hex(b"A"));
    assert_eq!(err["actual_hash"], sha256_hex(b"B"));

    // The sibling's content survives.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
        "B"
    );
    // No trace entry for a write that never landed.
    assert!(read_trace(&session).is_empty());

    // The lessons-learned post hook appended the failure.
    let knowledge = std::fs::read_to_string(session.paths.knowledge_file()).unwrap();
    assert!(knowledge.contains("## Verification failure"));
    assert!(knowledge.contains("src/a.ts"));

    // The path is stale-blocked for the next mutation attempt.
    let state = session.state.lock().await;
    assert!(state.stale_block("src/a.ts").is_some());
}

// Scenario 4: safe command passes without a prompt.
#[tokio::test]
async fn safe_command_passes_without_prompt() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let hitl = Arc::new(Scripted::new([]));
    let session = Session::new("s-1", dir.path()).with_hitl(hitl.clone());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let call = ToolCall::new("call-1", "execute_command", json!({"command": "git status"}));
    let outcome = driver.dispatch(&session, &call).await;
    assert!(outcome.result.success);
    assert!(outcome.result.content.contains("git status"));
    assert_eq!(hitl.prompt_count(), 0);

    let decisions = read_decisions(&session);
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].reason, "safe_command");
    assert!(decisions[0].approved());
    assert_eq!(decisions[0].command_classification.as_deref(), Some("safe"));
}

// Scenario 5: a persisted approval for the same (intent, command) is
// reused by a brand-new session without re-prompting.
#[tokio::test]
async fn destructive_command_approval_is_reused_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let driver = Driver::new();

    let first_hitl = Arc::new(Scripted::new([true]));
    let first = Session::new("s-1", dir.path()).with_hitl(first_hitl.clone());
    select_intent(&driver, &first).await;

    let call = ToolCall::new("call-1", "execute_command", json!({"command": "rm tmp"}));
    let outcome = driver.dispatch(&first, &call).await;
    assert!(outcome.result.success);
    assert_eq!(first_hitl.prompt_count(), 1);

    // A new session with a deny-everything HITL: the ledger speaks.
    let second = Session::new("s-2", dir.path()).with_hitl(Arc::new(DenyAll));
    select_intent(&driver, &second).await;

    let call = ToolCall::new("call-2", "execute_command", json!({"command": "rm tmp"}));
    let outcome = driver.dispatch(&second, &call).await;
    assert!(outcome.result.success, "{:?}", outcome.result);
}

// Scenario 6: a delete inside scope still triggers the
// destructive-operation preflight.
#[tokio::test]
async fn delete_via_patch_requires_preflight_even_in_scope() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/x.ts"), "doomed").unwrap();

    let hitl = Arc::new(Scripted::new([false]));
    let session = Session::new("s-1", dir.path()).with_hitl(hitl.clone());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let call = ToolCall::new(
        "call-1",
        "apply_patch",
        json!({"patch": "*** Delete File: src/x.ts"}),
    );
    let outcome = driver.dispatch(&session, &call).await;
    assert!(!outcome.result.success);

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "destructive_operation_denied");
    assert_eq!(err["code"], "REQ-008");

    assert!(dir.path().join("src/x.ts").exists());
    assert_eq!(hitl.prompt_count(), 1);
}

#[tokio::test]
async fn mutating_call_without_intent_is_vetoed_before_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    let outcome = driver.dispatch(&session, &write_call("call-1", "src/a.ts", "x")).await;
    assert!(!outcome.result.success);

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "no_active_intent");
    assert!(!dir.path().join("src/a.ts").exists());
}

#[tokio::test]
async fn partial_calls_bypass_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    // No intent selected, and a HITL that would deny everything.
    let session = Session::new("s-1", dir.path()).with_hitl(Arc::new(DenyAll));
    let driver = Driver::new();

    let call = write_call("call-1", "src/a.ts", "x").partial();
    let outcome = driver.dispatch(&session, &call).await;
    assert!(outcome.result.success);
    assert!(outcome.vetoed_by.is_none());
    // Nothing executed either.
    assert!(!dir.path().join("src/a.ts").exists());
}

#[tokio::test]
async fn declared_intent_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let call = ToolCall::new(
        "call-1",
        "write_file",
        json!({"path": "src/a.ts", "body": "x", "intent_id": "INT-99"}),
    );
    let outcome = driver.dispatch(&session, &call).await;
    assert!(!outcome.result.success);

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "intent_mismatch");
    assert_eq!(err["code"], "REQ-004");
    assert_eq!(err["provided_intent_id"], "INT-99");
}

#[tokio::test]
async fn invalid_mutation_class_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let call = ToolCall::new(
        "call-1",
        "write_file",
        json!({"path": "src/a.ts", "body": "x", "mutation_class": "TOTAL_REWRITE"}),
    );
    let outcome = driver.dispatch(&session, &call).await;
    assert!(!outcome.result.success);

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "invalid_metadata");
    assert_eq!(err["code"], "REQ-005");
    assert_eq!(err["mutation_class"], "TOTAL_REWRITE");
}

#[tokio::test]
async fn scope_prefix_requires_separator_boundary() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path()).with_hitl(Arc::new(DenyAll));
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    // `srctool.ts` is not under `src` despite the shared prefix.
    let outcome = driver
        .dispatch(&session, &write_call("call-1", "srctool.ts", "x"))
        .await;
    assert!(!outcome.result.success);
    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "scope_violation");
}

#[tokio::test]
async fn binary_writes_carry_whole_file_hash_only() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let body = "bin\u{0}ary";
    let call = ToolCall::new("call-1", "write_file", json!({"path": "src/blob", "body": body}));
    let outcome = driver.dispatch(&session, &call).await;
    assert!(outcome.result.success);

    let trace = read_trace(&session);
    assert_eq!(trace.len(), 1);
    let file = &trace[0].files[0];
    assert_eq!(file.content_hash, sha256_hex(body.as_bytes()));
    assert!(file.conversations[0].ranges.is_empty());
}

#[tokio::test]
async fn reselecting_the_intent_renders_the_same_block() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    let first = driver.dispatch(&session, &select_call()).await;
    let second = driver.dispatch(&session, &select_call()).await;
    assert_eq!(first.injected_context, second.injected_context);
}

#[tokio::test]
async fn trace_timestamps_are_monotonic_within_a_session() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let session = Session::new("s-1", dir.path());
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    for n in 0..3 {
        let call = write_call(&format!("call-{n}"), &format!("src/f{n}.ts"), "x");
        let outcome = driver.dispatch(&session, &call).await;
        assert!(outcome.result.success);
    }

    let trace = read_trace(&session);
    assert_eq!(trace.len(), 3);
    for pair in trace.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn ignore_listed_intent_bypasses_scope_checks() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    std::fs::write(dir.path().join(".ward/.intentignore"), "# exempt\nINT-1\n").unwrap();

    // DenyAll would reject the out-of-scope prompt if it were asked.
    let session = Session::new("s-1", dir.path()).with_hitl(Arc::new(DenyAll));
    let driver = Driver::new();

    select_intent(&driver, &session).await;

    let outcome = driver
        .dispatch(&session, &write_call("call-1", "other/a.ts", "x"))
        .await;
    assert!(outcome.result.success, "{:?}", outcome.result);
    assert!(dir.path().join("other/a.ts").exists());
}

#[tokio::test]
async fn destructive_user_message_gates_unknown_tools() {
    let dir = tempfile::tempdir().unwrap();
    seed_registry(dir.path());
    let hitl = Arc::new(Scripted::new([false]));
    let session = Session::new("s-1", dir.path()).with_hitl(hitl.clone());
    let driver = Driver::new();

    session.note_user_message("please delete all the fixtures").await;

    // An unclassified host tool with path-shaped args.
    let call = ToolCall::new("call-1", "annotate_file", json!({"path": "src/a.ts"}));
    let outcome = driver.dispatch(&session, &call).await;
    assert!(!outcome.result.success);

    let err: Value = serde_json::from_str(&outcome.result.content).unwrap();
    assert_eq!(err["error_type"], "destructive_intent_denied");
    assert_eq!(err["code"], "REQ-009");
    assert_eq!(hitl.prompt_count(), 1);
}
