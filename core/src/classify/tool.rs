//! Static tool classification.
//!
//! Two sets drive the gates: `destructive` tools require an active
//! intent; `mutating` tools (destructive minus the command-execution
//! tool) additionally get snapshots, metadata injection, scope checks,
//! and trace entries. Hosts may add or remove tools at runtime as they
//! register custom handlers.

use std::collections::HashSet;
use std::sync::RwLock;

use ward_protocol::tool_call::tool_names;

/// Coarse verdict for a tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    Safe,
    Destructive,
    Unknown,
}

/// Runtime-mutable tool sets.
#[derive(Debug)]
pub struct ToolClassifier {
    destructive: RwLock<HashSet<String>>,
    safe: RwLock<HashSet<String>>,
}

impl Default for ToolClassifier {
    fn default() -> Self {
        let destructive: HashSet<String> = [
            tool_names::WRITE_FILE,
            tool_names::APPLY_PATCH,
            tool_names::EXECUTE_COMMAND,
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let safe: HashSet<String> = [tool_names::READ_FILE, tool_names::SELECT_ACTIVE_INTENT]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            destructive: RwLock::new(destructive),
            safe: RwLock::new(safe),
        }
    }
}

impl ToolClassifier {
    /// Destructive: any mutating tool plus the shell-execution tool.
    pub fn is_destructive(&self, name: &str) -> bool {
        self.destructive
            .read()
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    /// Mutating: writes to the workspace filesystem. The command tool is
    /// destructive but not mutating (its effects are opaque).
    pub fn is_mutating(&self, name: &str) -> bool {
        name != tool_names::EXECUTE_COMMAND && self.is_destructive(name)
    }

    pub fn classify(&self, name: &str) -> ToolClass {
        if self.is_destructive(name) {
            return ToolClass::Destructive;
        }
        if self
            .safe
            .read()
            .map(|set| set.contains(name))
            .unwrap_or(false)
        {
            return ToolClass::Safe;
        }
        ToolClass::Unknown
    }

    /// Register a host tool as destructive (and therefore mutating,
    /// unless it is the command tool).
    pub fn add_destructive(&self, name: impl Into<String>) {
        if let Ok(mut set) = self.destructive.write() {
            set.insert(name.into());
        }
    }

    /// Register a host tool as known-safe.
    pub fn add_safe(&self, name: impl Into<String>) {
        if let Ok(mut set) = self.safe.write() {
            set.insert(name.into());
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut set) = self.destructive.write() {
            set.remove(name);
        }
        if let Ok(mut set) = self.safe.write() {
            set.remove(name);
        }
    }
}
