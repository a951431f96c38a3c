//! Timestamp oracle capability.
//!
//! Staleness detection never reads file contents - it compares the
//! last-modified markers recorded at cache time against what the oracle
//! reports now. Abstracting the lookup behind [`TimestampOracle`] keeps the
//! cache core testable without real filesystem state; [`FsOracle`] is the
//! native implementation used in production.

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// A file's last-modified marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl FileStamp {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

/// Capability for retrieving a file's last-modified marker.
///
/// An `Err` means the file cannot be statted (missing, inaccessible); the
/// staleness checker treats that as "changed".
#[async_trait]
pub trait TimestampOracle: Send + Sync + std::fmt::Debug {
    async fn timestamp(&self, path: &Path) -> io::Result<FileStamp>;
}

/// Native oracle backed by `tokio::fs::metadata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOracle;

#[async_trait]
impl TimestampOracle for FsOracle {
    async fn timestamp(&self, path: &Path) -> io::Result<FileStamp> {
        let metadata = tokio::fs::metadata(path).await?;
        // Platforms without a usable mtime fold to zero rather than erroring;
        // a zero stamp still detects change against any real recorded value.
        let millis = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(FileStamp::new(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_oracle_stamps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dep.json");
        std::fs::write(&path, b"{}").unwrap();

        let stamp = FsOracle.timestamp(&path).await.unwrap();
        assert!(stamp.timestamp > 0);
    }

    #[tokio::test]
    async fn test_fs_oracle_errors_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");

        let err = FsOracle.timestamp(&missing).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
