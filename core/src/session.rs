//! Session-scoped state and dependencies.
//!
//! A session is one governed conversation: it owns the active intent,
//! the snapshot map, stale-block bookkeeping, and the approval caches.
//! All of it lives in one explicit [`SessionState`] record guarded by a
//! single async mutex; hooks never attach ad-hoc fields anywhere else.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;
use ward_protocol::Contributor;
use ward_protocol::Intent;
use ward_protocol::UserIntentClassification;
use ward_protocol::VerificationFailure;

use crate::classify::tool::ToolClassifier;
use crate::config::OrchestrationPaths;
use crate::diagnostics::DiagnosticsSink;
use crate::fs::LocalFs;
use crate::fs::WorkspaceFs;
use crate::hitl::ApproveAll;
use crate::hitl::Hitl;
use crate::llm::ClassifierClient;

/// The intent currently governing this session.
#[derive(Debug, Clone)]
pub struct ActiveIntent {
    pub id: String,
    pub selected_at: DateTime<Utc>,
    /// Rendered `<intent_context>` block bound to the session.
    pub context_block: String,
    /// The full record, kept for scope checks.
    pub intent: Intent,
}

/// Pre-mutation capture for one `(tool_call, path)` pair.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Text content before the mutation; `None` for missing or binary
    /// files.
    pub before: Option<String>,
    pub existed: bool,
    pub binary: bool,
}

/// Marker that a path is known to be out of sync with its snapshot.
#[derive(Debug, Clone)]
pub struct StaleBlock {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
}

/// Composite key for in-session approval caches.
pub fn command_key(intent_id: Option<&str>, command: &str) -> String {
    format!("{}\u{1f}{command}", intent_id.unwrap_or(""))
}

/// Everything mutable a session owns.
#[derive(Debug, Default)]
pub struct SessionState {
    active_intent: Option<ActiveIntent>,

    /// `tool_call_id -> normalized path -> snapshot`.
    snapshots: HashMap<String, HashMap<String, Snapshot>>,

    /// `normalized path -> block`.
    stale_blocks: HashMap<String, StaleBlock>,

    /// HITL results for this session, keyed by check-specific strings.
    decision_cache: HashMap<String, bool>,

    /// Commands approved (or classified safe) this session, keyed by
    /// [`command_key`].
    approved_commands: HashSet<String>,

    /// Destructive-operation approvals, keyed by a summary of the
    /// operation.
    destructive_approvals: HashSet<String>,

    last_verification_failure: Option<VerificationFailure>,

    last_user_intent: Option<UserIntentClassification>,

    /// Most recent user message, provided by the host before dispatch.
    last_user_message: Option<String>,

    /// In-flight dispatch flag; a session serves one tool call at a
    /// time.
    dispatching: bool,
}

impl SessionState {
    // Active intent

    pub fn active_intent(&self) -> Option<&ActiveIntent> {
        self.active_intent.as_ref()
    }

    pub fn set_active_intent(&mut self, intent: ActiveIntent) {
        self.active_intent = Some(intent);
    }

    /// Session end / explicit re-selection.
    pub fn clear_active_intent(&mut self) {
        self.active_intent = None;
    }

    // Snapshots

    pub fn put_snapshot(&mut self, call_id: &str, path: String, snapshot: Snapshot) {
        self.snapshots
            .entry(call_id.to_string())
            .or_default()
            .insert(path, snapshot);
    }

    pub fn snapshot(&self, call_id: &str, path: &str) -> Option<&Snapshot> {
        self.snapshots.get(call_id).and_then(|m| m.get(path))
    }

    /// Consume the snapshot map for a call (trace writer).
    pub fn take_snapshots(&mut self, call_id: &str) -> HashMap<String, Snapshot> {
        self.snapshots.remove(call_id).unwrap_or_default()
    }

    // Stale blocks

    pub fn stale_block(&self, path: &str) -> Option<&StaleBlock> {
        self.stale_blocks.get(path)
    }

    pub fn set_stale_block(&mut self, path: String, block: StaleBlock) {
        self.stale_blocks.insert(path, block);
    }

    pub fn clear_stale_block(&mut self, path: &str) {
        self.stale_blocks.remove(path);
    }

    // Decision cache

    pub fn cached_decision(&self, key: &str) -> Option<bool> {
        self.decision_cache.get(key).copied()
    }

    pub fn cache_decision(&mut self, key: String, approved: bool) {
        self.decision_cache.insert(key, approved);
    }

    // Approved commands

    pub fn is_command_approved(&self, key: &str) -> bool {
        self.approved_commands.contains(key)
    }

    pub fn approve_command(&mut self, key: String) {
        self.approved_commands.insert(key);
    }

    // Destructive approvals

    pub fn is_destructive_approved(&self, key: &str) -> bool {
        self.destructive_approvals.contains(key)
    }

    pub fn approve_destructive(&mut self, key: String) {
        self.destructive_approvals.insert(key);
    }

    // Verification failure

    pub fn record_verification_failure(&mut self, failure: VerificationFailure) {
        self.last_verification_failure = Some(failure);
    }

    pub fn take_verification_failure(&mut self) -> Option<VerificationFailure> {
        self.last_verification_failure.take()
    }

    // User message / classification

    pub fn set_last_user_message(&mut self, message: impl Into<String>) {
        self.last_user_message = Some(message.into());
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.last_user_message.as_deref()
    }

    pub fn cache_user_intent(&mut self, classification: UserIntentClassification) {
        self.last_user_intent = Some(classification);
    }

    pub fn cached_user_intent(&self, message_hash: &str) -> Option<&UserIntentClassification> {
        self.last_user_intent
            .as_ref()
            .filter(|c| c.message_hash == message_hash)
    }

    // Dispatch lock

    pub fn try_begin_dispatch(&mut self) -> bool {
        if self.dispatching {
            return false;
        }
        self.dispatching = true;
        true
    }

    pub fn end_dispatch(&mut self) {
        self.dispatching = false;
    }

    /// Full session reset: clears the intent and every cache.
    pub fn clear(&mut self) {
        *self = SessionState::default();
    }
}

/// One governed session: state plus the dependencies hooks need.
pub struct Session {
    pub id: String,
    pub cwd: PathBuf,
    pub paths: OrchestrationPaths,
    pub state: Mutex<SessionState>,
    pub fs: Arc<dyn WorkspaceFs>,
    pub hitl: Arc<dyn Hitl>,
    pub classifier: Option<Arc<dyn ClassifierClient>>,
    pub tools: Arc<ToolClassifier>,
    pub contributor: Contributor,
    pub diagnostics: DiagnosticsSink,
}

impl Session {
    pub fn new(id: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let paths = OrchestrationPaths::for_cwd(&cwd);
        let diagnostics = DiagnosticsSink::new(paths.diagnostics_file());
        Self {
            id: id.into(),
            cwd,
            paths,
            state: Mutex::new(SessionState::default()),
            fs: Arc::new(LocalFs),
            hitl: Arc::new(ApproveAll),
            classifier: None,
            tools: Arc::new(ToolClassifier::default()),
            contributor: Contributor::default(),
            diagnostics,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn WorkspaceFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_hitl(mut self, hitl: Arc<dyn Hitl>) -> Self {
        self.hitl = hitl;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ClassifierClient>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_contributor(mut self, contributor: Contributor) -> Self {
        self.contributor = contributor;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolClassifier>) -> Self {
        self.tools = tools;
        self
    }

    /// The host calls this when the user sends a new message, before the
    /// next tool call is dispatched.
    pub async fn note_user_message(&self, message: &str) {
        self.state.lock().await.set_last_user_message(message);
    }

    /// Resolve a tool-call path against this session's cwd.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        crate::fs::resolve(&self.cwd, raw)
    }

    /// Normalize a tool-call path to the canonical session-relative form.
    pub fn normalize(&self, raw: &str) -> String {
        crate::paths::normalize(raw, &self.cwd)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_lock_is_exclusive() {
        let mut state = SessionState::default();
        assert!(state.try_begin_dispatch());
        assert!(!state.try_begin_dispatch());
        state.end_dispatch();
        assert!(state.try_begin_dispatch());
    }

    #[test]
    fn snapshots_are_consumed_per_call() {
        let mut state = SessionState::default();
        state.put_snapshot(
            "call-1",
            "src/a.ts".to_string(),
            Snapshot {
                before: Some("A".to_string()),
                existed: true,
                binary: false,
            },
        );

        assert!(state.snapshot("call-1", "src/a.ts").is_some());
        let taken = state.take_snapshots("call-1");
        assert_eq!(taken.len(), 1);
        assert!(state.snapshot("call-1", "src/a.ts").is_none());
    }

    #[test]
    fn user_intent_cache_is_keyed_by_message_hash() {
        use ward_protocol::ClassificationSource;
        use ward_protocol::IntentVerdict;

        let mut state = SessionState::default();
        state.cache_user_intent(UserIntentClassification {
            verdict: IntentVerdict::Safe,
            reason: None,
            confidence: Some(0.4),
            source: ClassificationSource::Heuristic,
            message_hash: "abc".to_string(),
        });

        assert!(state.cached_user_intent("abc").is_some());
        assert!(state.cached_user_intent("def").is_none());
    }
}
