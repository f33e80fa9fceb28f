//! # Ward Protocol
//!
//! Shared data model for the ward governance middleware.
//!
//! Everything the middleware persists or passes across a seam lives here:
//! intent records, tool calls, audit trace entries, HITL decisions,
//! message classifications, and the structured veto envelope returned to
//! the model when a gate blocks a tool call.
//!
//! This crate is pure data: serde types plus small helpers, no I/O.

pub mod classify;
pub mod decision;
pub mod error;
pub mod intent;
pub mod tool_call;
pub mod trace;

pub use classify::ClassificationSource;
pub use classify::IntentVerdict;
pub use classify::UserIntentClassification;
pub use decision::Decision;
pub use decision::DecisionVerdict;
pub use error::GateCode;
pub use error::GateError;
pub use error::GateErrorKind;
pub use error::VerificationFailure;
pub use intent::Intent;
pub use intent::IntentStatus;
pub use intent::IntentsFile;
pub use tool_call::MutationClass;
pub use tool_call::ToolArgs;
pub use tool_call::ToolCall;
pub use tool_call::ToolResult;
pub use trace::Contributor;
pub use trace::Conversation;
pub use trace::FileTrace;
pub use trace::RangeTrace;
pub use trace::Related;
pub use trace::TraceEntry;
pub use trace::VcsInfo;
