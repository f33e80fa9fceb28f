//! # Ward Hooks
//!
//! An ordered pre/post hook engine for the tool-dispatch pipeline.
//!
//! Hooks intercept tool calls on either side of the handler:
//! - **pre** hooks run before the handler in registration order and can
//!   veto the call, inject context for the model, or rewrite arguments;
//! - **post** hooks run after the handler unconditionally, for auditing
//!   and bookkeeping.
//!
//! The engine itself is stateless: all mutable state lives on the
//! session context `C` the host threads through [`HookEngine::execute_pre`]
//! and [`HookEngine::execute_post`].

pub mod engine;
pub mod outcome;

pub use engine::HookEngine;
pub use engine::PostDispatchEntry;
pub use engine::PostHook;
pub use engine::PreDispatch;
pub use engine::PreHook;
pub use outcome::HookFailure;
pub use outcome::PostOutcome;
pub use outcome::PreOutcome;
