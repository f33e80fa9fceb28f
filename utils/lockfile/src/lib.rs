//! Cross-process exclusive append.
//!
//! The governance ledgers (`agent_trace.jsonl`, `intent-decisions.jsonl`,
//! `AGENT.md`, ...) are shared across sessions and across processes.
//! Writers serialize through a sidecar `<path>.lock` file created with
//! exclusive-create semantics (`O_EXCL|O_CREAT` on POSIX, the equivalent
//! on Windows); readers are lock-free and tolerate partial lines.
//!
//! The lock is never held across expensive work: acquire, append one
//! blob, release.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Maximum lock acquisition attempts before giving up.
const MAX_LOCK_ATTEMPTS: u32 = 8;

/// Base backoff; attempt `n` sleeps `n * BACKOFF_STEP`.
const BACKOFF_STEP: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum AppendError {
    #[error("failed to create parent directory for {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not acquire lock {lock_path} after {attempts} attempts: {source}")]
    LockContended {
        lock_path: PathBuf,
        attempts: u32,
        source: std::io::Error,
    },

    #[error("failed to append to {path}: {source}")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Sidecar lock guard. Unlinks the lock file on drop so an append that
/// errors out still releases the lock.
struct LockGuard {
    lock_path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.lock_path) {
            // A missing lock file at this point is not actionable;
            // anything else deserves a log line.
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    lock_path = %self.lock_path.display(),
                    error = %err,
                    "failed to remove sidecar lock"
                );
            }
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

async fn acquire_lock(path: &Path) -> Result<LockGuard, AppendError> {
    let lock_path = lock_path_for(path);

    for attempt in 1..=MAX_LOCK_ATTEMPTS {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {
                return Ok(LockGuard {
                    lock_path: lock_path.clone(),
                });
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                if attempt == MAX_LOCK_ATTEMPTS {
                    return Err(AppendError::LockContended {
                        lock_path,
                        attempts: attempt,
                        source: err,
                    });
                }
                tracing::debug!(
                    lock_path = %lock_path.display(),
                    attempt,
                    "lock held elsewhere, backing off"
                );
                tokio::time::sleep(BACKOFF_STEP * attempt).await;
            }
            Err(err) => {
                return Err(AppendError::LockContended {
                    lock_path,
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }

    // Loop always returns; the compiler just cannot see it.
    unreachable!("lock acquisition loop must return")
}

/// Append `content` to `path`, creating parent directories as needed,
/// serialized against other processes via the sidecar lockfile.
///
/// Prior bytes of the file are never touched: this is append-only.
pub async fn append_with_lock(path: &Path, content: &str) -> Result<(), AppendError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AppendError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }

    let _guard = acquire_lock(path).await?;

    use std::io::Write;
    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(content.as_bytes()));

    result.map_err(|source| AppendError::Append {
        path: path.to_path_buf(),
        source,
    })
}

/// Append one JSON value as a single JSONL line.
pub async fn append_jsonl<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), AppendError> {
    let line = match serde_json::to_string(value) {
        Ok(line) => line,
        Err(err) => {
            return Err(AppendError::Append {
                path: path.to_path_buf(),
                source: std::io::Error::new(ErrorKind::InvalidData, err),
            });
        }
    };
    append_with_lock(path, &format!("{line}\n")).await
}

/// Read a JSONL file, skipping lines that fail to parse.
///
/// Readers are lock-free by design: a line being appended concurrently
/// may be seen half-written, and is simply skipped on this pass.
pub fn read_jsonl_tolerant<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<T>(line) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "skipping unparseable ledger line"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde::Serialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        n: u32,
    }

    #[tokio::test]
    async fn append_creates_parents_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/ledger.jsonl");

        append_with_lock(&path, "one\n").await.unwrap();
        append_with_lock(&path, "two\n").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "one\ntwo\n");
        // Lock is released.
        assert!(!path.with_extension("jsonl.lock").exists());
    }

    #[tokio::test]
    async fn stale_lock_blocks_then_errors_after_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(lock_path_for(&path), "").unwrap();

        let err = append_with_lock(&path, "x").await.unwrap_err();
        assert!(matches!(
            err,
            AppendError::LockContended { attempts: 8, .. }
        ));
        // The stale foreign lock must not be deleted on the failure path.
        assert!(lock_path_for(&path).exists());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn concurrent_appends_preserve_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let mut handles = Vec::new();
        for n in 0..16u32 {
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                append_jsonl(&path, &Row { n }).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut rows: Vec<Row> = read_jsonl_tolerant(&path);
        rows.sort_by_key(|r| r.n);
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[0], Row { n: 0 });
        assert_eq!(rows[15], Row { n: 15 });
    }

    #[test]
    fn tolerant_reader_skips_garbage_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "{\"n\":1}\nnot json\n{\"n\":2}\n{\"n\":").unwrap();

        let rows: Vec<Row> = read_jsonl_tolerant(&path);
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }]);
    }

    #[test]
    fn missing_file_reads_empty() {
        let rows: Vec<Row> = read_jsonl_tolerant(Path::new("/nonexistent/ledger.jsonl"));
        assert!(rows.is_empty());
    }
}
