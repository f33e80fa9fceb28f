//! # Ward Core
//!
//! Intent-governed tool execution middleware for an AI coding agent
//! host.
//!
//! The host receives tool-call requests from a language model,
//! dispatches them to side-effecting handlers, and returns structured
//! results. Between the model's request and the handler's execution this
//! crate enforces the governance contract:
//!
//! - every mutating action is declared against a registered intent
//!   selected through the [`intent`] handshake;
//! - targets must fall inside the intent's owned scope ([`gate`]);
//! - shell commands are classified and gated ([`classify`]);
//! - mutations carry provenance metadata and survive an
//!   optimistic-concurrency check ([`snapshot`]);
//! - every completed mutation lands in an append-only audit ledger
//!   ([`trace`]), and verification failures feed the shared knowledge
//!   file ([`knowledge`]).
//!
//! The [`driver`] module ties it together: per tool call it runs the
//! pre-hook chain, the handler, and the post-hook chain, all against a
//! [`session::Session`].

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod fs;
pub mod gate;
pub mod hitl;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod paths;
pub mod session;
pub mod snapshot;
pub mod tools;
pub mod trace;

pub use config::OrchestrationPaths;
pub use driver::Driver;
pub use error::CoreError;
pub use session::Session;
pub use session::SessionState;

use sha2::Digest;
use sha2::Sha256;

/// SHA-256 over raw bytes, lowercase hex. The one hash used everywhere:
/// whole-file hashes, range hashes, message-cache keys.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
