//! Internal error type for middleware plumbing.
//!
//! Not to be confused with [`ward_protocol::GateError`], the structured
//! veto envelope surfaced to the model. `CoreError` covers the
//! middleware's own failures: unreadable sidecar files, YAML parse
//! errors, ledger lock exhaustion.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Ledger(#[from] ward_utils_lockfile::AppendError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
