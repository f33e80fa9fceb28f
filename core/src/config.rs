//! Orchestration directory layout.
//!
//! All governance sidecar files live in one directory derived from the
//! session's working directory. No environment variables are consulted.

use std::path::Path;
use std::path::PathBuf;

/// Name of the orchestration directory under the session cwd.
pub const ORCHESTRATION_DIR: &str = ".ward";

/// Resolved paths of every sidecar file the middleware touches.
#[derive(Debug, Clone)]
pub struct OrchestrationPaths {
    /// The orchestration directory itself.
    pub root: PathBuf,
}

impl OrchestrationPaths {
    /// Derive the layout from a session working directory.
    pub fn for_cwd(cwd: &Path) -> Self {
        Self {
            root: cwd.join(ORCHESTRATION_DIR),
        }
    }

    /// `active_intents.yaml`: the read-only intent registry.
    pub fn intents_file(&self) -> PathBuf {
        self.root.join("active_intents.yaml")
    }

    /// `.intentignore`: intent ids exempt from gating.
    pub fn ignore_file(&self) -> PathBuf {
        self.root.join(".intentignore")
    }

    /// `command-policy.json`: project command classification overrides.
    pub fn command_policy_json(&self) -> PathBuf {
        self.root.join("command-policy.json")
    }

    /// `command-policy.yaml`: YAML flavor of the same.
    pub fn command_policy_yaml(&self) -> PathBuf {
        self.root.join("command-policy.yaml")
    }

    /// `agent_trace.jsonl`: the append-only audit ledger.
    pub fn trace_file(&self) -> PathBuf {
        self.root.join("agent_trace.jsonl")
    }

    /// `intent-decisions.jsonl`: the append-only HITL decision ledger.
    pub fn decisions_file(&self) -> PathBuf {
        self.root.join("intent-decisions.jsonl")
    }

    /// `agent-diagnostics.jsonl`: structured debug events.
    pub fn diagnostics_file(&self) -> PathBuf {
        self.root.join("agent-diagnostics.jsonl")
    }

    /// `AGENT.md`: human-readable shared knowledge.
    pub fn knowledge_file(&self) -> PathBuf {
        self.root.join("AGENT.md")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_derived_from_cwd() {
        let paths = OrchestrationPaths::for_cwd(Path::new("/work/project"));
        assert_eq!(
            paths.intents_file(),
            PathBuf::from("/work/project/.ward/active_intents.yaml")
        );
        assert_eq!(
            paths.trace_file(),
            PathBuf::from("/work/project/.ward/agent_trace.jsonl")
        );
    }
}
