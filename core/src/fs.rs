//! Workspace filesystem seam.
//!
//! Real patch application and file I/O belong to the host; the
//! middleware only needs to read files for snapshots and hashing, and
//! the built-in handlers need a write primitive. Both go through
//! [`WorkspaceFs`] so tests can substitute an in-memory tree.

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::CoreError;

/// Raw bytes of a file, plus derived facts the snapshot layer needs.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub bytes: Vec<u8>,
}

impl FileContent {
    /// Binary iff any byte is NUL.
    pub fn is_binary(&self) -> bool {
        self.bytes.contains(&0u8)
    }

    /// Text view, lossy for files that are "mostly text".
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Minimal filesystem contract the middleware consumes.
#[async_trait]
pub trait WorkspaceFs: Send + Sync {
    /// Read a file. `Ok(None)` means "does not exist"; `Err` is a real
    /// I/O failure (permissions etc.).
    async fn read(&self, path: &Path) -> Result<Option<FileContent>, CoreError>;

    /// Write a file, creating parent directories.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), CoreError>;

    /// Remove a file. Removing a missing file is not an error.
    async fn remove(&self, path: &Path) -> Result<(), CoreError>;
}

/// The real filesystem.
#[derive(Debug, Default)]
pub struct LocalFs;

#[async_trait]
impl WorkspaceFs for LocalFs {
    async fn read(&self, path: &Path) -> Result<Option<FileContent>, CoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(FileContent { bytes })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| CoreError::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| CoreError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn remove(&self, path: &Path) -> Result<(), CoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CoreError::Write {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Resolve a workspace-relative (or absolute) path against the cwd.
pub fn resolve(cwd: &Path, raw: &str) -> PathBuf {
    let forward = raw.replace('\\', "/");
    let path = Path::new(&forward);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fs_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs;
        assert!(fs.read(&dir.path().join("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_fs_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs;
        let path = dir.path().join("a/b/c.txt");
        fs.write(&path, b"hi").await.unwrap();
        let content = fs.read(&path).await.unwrap().unwrap();
        assert_eq!(content.text(), "hi");
        assert!(!content.is_binary());
    }

    #[test]
    fn binary_sniff_is_nul_byte() {
        assert!(FileContent { bytes: vec![1, 0, 2] }.is_binary());
        assert!(!FileContent { bytes: b"plain".to_vec() }.is_binary());
    }
}
