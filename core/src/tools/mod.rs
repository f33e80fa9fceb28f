//! Tool handlers and the dispatch registry.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ward_protocol::ToolCall;
use ward_protocol::ToolResult;
use ward_protocol::tool_call::tool_names;

use crate::session::Session;

/// One side-effecting tool implementation.
///
/// Handlers run after the pre-hook chain has approved the call and are
/// responsible for the final optimistic re-check immediately before any
/// write.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, session: &Session, call: &ToolCall) -> ToolResult;
}

/// Name → handler table.
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl Default for ToolRegistry {
    /// The built-in surface: file write, patch application, command
    /// authorization, file read, and the intent-selection echo.
    fn default() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register(tool_names::WRITE_FILE, Arc::new(handlers::WriteFileHandler));
        registry.register(tool_names::APPLY_PATCH, Arc::new(handlers::ApplyPatchHandler));
        registry.register(
            tool_names::EXECUTE_COMMAND,
            Arc::new(handlers::ExecuteCommandHandler),
        );
        registry.register(tool_names::READ_FILE, Arc::new(handlers::ReadFileHandler));
        registry.register(
            tool_names::SELECT_ACTIVE_INTENT,
            Arc::new(handlers::SelectIntentHandler),
        );
        registry
    }
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke the handler for a call. Unknown tools produce an error
    /// result, not a panic.
    pub async fn handle(&self, session: &Session, call: &ToolCall) -> ToolResult {
        match self.handlers.get(&call.name) {
            Some(handler) => handler.handle(session, call).await,
            None => ToolResult::error(format!("unknown tool '{}'", call.name)),
        }
    }
}
