//! Human-in-the-loop confirmation seam.
//!
//! Every gate that can be overridden funnels through one asynchronous
//! yes/no call. Any frontend satisfies it: a modal dialog, a CLI
//! confirmation, or a test stub.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

/// One approval request shown to the human.
#[derive(Debug, Clone)]
pub struct HitlPrompt {
    /// Short title, e.g. "Out-of-scope write".
    pub title: String,

    /// Full explanation: what is about to happen and why it was flagged.
    pub detail: String,

    /// Machine tag naming the check (`scope_violation`,
    /// `destructive_command`, ...). Recorded on the decision ledger.
    pub reason: String,
}

impl HitlPrompt {
    pub fn new(
        title: impl Into<String>,
        detail: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
            reason: reason.into(),
        }
    }
}

/// The confirmation seam. `true` approves, `false` rejects.
#[async_trait]
pub trait Hitl: Send + Sync {
    async fn confirm(&self, prompt: &HitlPrompt) -> bool;
}

/// Approves everything. The default for non-interactive hosts that rely
/// on gating semantics other than prompting.
#[derive(Debug, Default)]
pub struct ApproveAll;

#[async_trait]
impl Hitl for ApproveAll {
    async fn confirm(&self, _prompt: &HitlPrompt) -> bool {
        true
    }
}

/// Rejects everything.
#[derive(Debug, Default)]
pub struct DenyAll;

#[async_trait]
impl Hitl for DenyAll {
    async fn confirm(&self, _prompt: &HitlPrompt) -> bool {
        false
    }
}

/// Scripted answers for tests; also records the prompts it saw.
#[derive(Debug, Default)]
pub struct Scripted {
    answers: Mutex<VecDeque<bool>>,
    seen: Mutex<Vec<HitlPrompt>>,
    /// Answer once the script is exhausted.
    default_answer: bool,
}

impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
            default_answer: false,
        }
    }

    pub fn prompts_seen(&self) -> Vec<HitlPrompt> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn prompt_count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Hitl for Scripted {
    async fn confirm(&self, prompt: &HitlPrompt) -> bool {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(prompt.clone());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(self.default_answer)
    }
}
