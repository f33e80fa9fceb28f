//! Hook outcomes.

use thiserror::Error;
use ward_protocol::GateError;
use ward_protocol::ToolArgs;

/// Internal failure inside a hook body.
///
/// Distinct from a veto: a veto is the hook doing its job, a failure is
/// the hook itself breaking. The engine converts failures into vetoes
/// with a synthesized message so a broken gate fails closed.
#[derive(Debug, Error)]
#[error("hook '{hook}' failed: {message}")]
pub struct HookFailure {
    pub hook: String,
    pub message: String,
}

impl HookFailure {
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Result of one pre-hook.
#[derive(Debug, Default)]
pub struct PreOutcome {
    /// False vetoes the call; the handler is never invoked.
    pub proceed: bool,

    /// Structured veto envelope, present when `proceed` is false.
    pub error: Option<GateError>,

    /// Context to surface to the model alongside the tool result.
    /// Multiple hooks' contributions concatenate.
    pub injected_context: Option<String>,

    /// Replacement arguments for the handler. A later hook's replacement
    /// overwrites an earlier one's.
    pub modified_args: Option<ToolArgs>,
}

impl PreOutcome {
    /// Allow the call through unchanged.
    pub fn proceed() -> Self {
        Self {
            proceed: true,
            ..Self::default()
        }
    }

    /// Veto the call with a structured envelope.
    pub fn veto(error: GateError) -> Self {
        Self {
            proceed: false,
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.injected_context = Some(context.into());
        self
    }

    pub fn with_args(mut self, args: ToolArgs) -> Self {
        self.modified_args = Some(args);
        self
    }
}

/// Result of one post-hook. Never fatal to the tool call.
#[derive(Debug, Default)]
pub struct PostOutcome {
    pub success: bool,

    /// Error message when `success` is false.
    pub error: Option<String>,

    /// Human-readable note about what the hook did (e.g. "trace entry
    /// appended").
    pub side_effects: Option<String>,
}

impl PostOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn ok_with(side_effects: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            side_effects: Some(side_effects.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            side_effects: None,
        }
    }
}
