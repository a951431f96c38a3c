//! Filesystem artifact store.
//!
//! One self-contained file per entry at `<directory>/<hex-key>.json`, with a
//! `.gz` suffix when compression is on. There is no index or manifest; the
//! whole directory can be deleted at any time and the cache rebuilds itself.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::artifact::Artifact;
use crate::key::CacheKey;

/// Reads and writes cached artifacts in a chosen directory.
///
/// The store is directory-agnostic: the orchestrator passes the resolved
/// directory on every call, so one store value serves both the primary
/// location and the temporary-directory fallback.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactStore {
    compress: bool,
}

impl ArtifactStore {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    /// Path of the entry file for `key` under the active compression setting.
    pub fn entry_path(&self, directory: &Path, key: &CacheKey) -> PathBuf {
        let extension = if self.compress { "json.gz" } else { "json" };
        directory.join(format!("{}.{extension}", key.as_hex()))
    }

    /// Read the artifact stored for `key` in `directory`.
    ///
    /// Every failure mode - missing file, unreadable bytes, failed
    /// decompression, malformed JSON - maps uniformly to `None`. A corrupt
    /// entry is exactly a cache miss, never a fatal error.
    pub async fn read(&self, directory: &Path, key: &CacheKey) -> Option<Artifact> {
        let path = self.entry_path(directory, key);
        let bytes = tokio::fs::read(&path).await.ok()?;

        let json = if self.compress {
            let mut decoder = GzDecoder::new(bytes.as_slice());
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed).ok()?;
            decompressed
        } else {
            bytes
        };

        serde_json::from_slice(&json).ok()
    }

    /// Write the artifact for `key` into `directory`.
    ///
    /// Creates the directory (recursively) immediately before writing.
    /// Failures are reported, not swallowed; the orchestrator decides whether
    /// to retry in the temporary-directory fallback.
    pub async fn write(
        &self,
        directory: &Path,
        key: &CacheKey,
        artifact: &Artifact,
    ) -> io::Result<()> {
        let json = serde_json::to_vec(artifact)?;

        let payload = if self.compress {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&json)?;
            encoder.finish()?
        } else {
            json
        };

        tokio::fs::create_dir_all(directory).await?;
        tokio::fs::write(self.entry_path(directory, key), payload).await
    }
}
