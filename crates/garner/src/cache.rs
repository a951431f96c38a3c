//! Cache orchestration.
//!
//! Ties the fingerprint builder, artifact store, directory resolver, and
//! staleness checker together: compute the key, attempt a read, validate
//! freshness, on miss or stale invoke the transform, persist, and retry once
//! in the temporary directory when the chosen location is unwritable.
//!
//! The cache is embedder-controlled: the caller decides where entries are
//! stored and supplies the transform and timestamp oracle per request.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;

use crate::artifact::{Artifact, SourceMap};
use crate::key::compute_cache_key;
use crate::oracle::TimestampOracle;
use crate::resolver::{ResolverInputs, resolve_default_dir};
use crate::serialize::ConfigValue;
use crate::staleness::{fill_timestamps, is_stale};
use crate::store::ArtifactStore;
use crate::transform::Transform;
use crate::{Error, Result};

/// Where cache entries live.
#[derive(Debug, Clone, Default)]
pub enum CacheLocation {
    /// Resolve through the environment override and project-root discovery,
    /// degrading to the temporary directory.
    #[default]
    Default,
    /// Use exactly this directory. A pinned directory is never silently
    /// replaced by the temporary-directory fallback.
    Pinned(PathBuf),
}

/// Configuration for a [`Cache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory preference.
    pub location: CacheLocation,

    /// Gzip entries on disk. On by default.
    pub compress: bool,

    /// Inputs for default-directory resolution, captured from the process
    /// environment unless substituted.
    pub resolver: ResolverInputs,
}

impl CacheConfig {
    /// Default location, compression on, resolver inputs captured from the
    /// process environment.
    pub fn new() -> Self {
        Self {
            location: CacheLocation::Default,
            compress: true,
            resolver: ResolverInputs::from_env(),
        }
    }

    /// Pin the cache to an explicit directory.
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.location = CacheLocation::Pinned(dir.into());
        self
    }

    /// Toggle gzip compression of stored entries.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Substitute the directory-resolution inputs. Tests use this instead of
    /// mutating the process environment.
    pub fn with_resolver(mut self, resolver: ResolverInputs) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What a cache request hands back to the calling pipeline.
///
/// External dependencies are internal bookkeeping and deliberately absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOutput {
    pub code: String,
    pub map: Option<SourceMap>,
    pub metadata: Option<serde_json::Value>,
}

impl From<Artifact> for CacheOutput {
    fn from(artifact: Artifact) -> Self {
        Self {
            code: artifact.code,
            map: artifact.map,
            metadata: artifact.metadata,
        }
    }
}

/// The conventional cache identifier for version-derived busting:
/// `core<compiler-version>,loader<this crate's version>`. A new compiler or
/// a new cache release each invalidate every prior entry.
pub fn version_identifier(compiler_version: &str) -> String {
    format!(
        "core{compiler_version},loader{}",
        env!("CARGO_PKG_VERSION")
    )
}

/// Persistent content-addressed result cache.
///
/// The default directory is resolved once per `Cache` value and reused;
/// construct a fresh `Cache` to re-resolve.
#[derive(Debug)]
pub struct Cache {
    config: CacheConfig,
    store: ArtifactStore,
    resolved_dir: OnceCell<PathBuf>,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        let store = ArtifactStore::new(config.compress);
        Self {
            config,
            store,
            resolved_dir: OnceCell::new(),
        }
    }

    /// Return the cached result for `(config, source, identifier)`, invoking
    /// `transform` on a miss or stale entry.
    ///
    /// A transform failure propagates unchanged and is never cached. A write
    /// failure is retried once with the temporary directory as the forced
    /// location, unless the directory was pinned or already the temporary
    /// directory; past that it surfaces as [`Error::CacheWrite`].
    pub async fn get_or_compute(
        &self,
        source: &str,
        config: &ConfigValue,
        identifier: &str,
        transform: &dyn Transform,
        oracle: &dyn TimestampOracle,
    ) -> Result<CacheOutput> {
        let directory = self.target_dir().await;

        match self
            .run_in(directory, source, config, identifier, transform, oracle)
            .await
        {
            Ok(artifact) => Ok(artifact.into()),
            Err(err @ Error::CacheWrite { .. }) if self.may_fall_back(directory) => {
                let fallback = self.config.resolver.temp_dir.clone();
                tracing::debug!(
                    error = %err,
                    fallback = %fallback.display(),
                    "Cache write failed, retrying in temporary directory"
                );
                self.run_in(&fallback, source, config, identifier, transform, oracle)
                    .await
                    .map(CacheOutput::from)
            }
            Err(err) => Err(err),
        }
    }

    /// The directory this cache stores into before any fallback.
    async fn target_dir(&self) -> &Path {
        match &self.config.location {
            CacheLocation::Pinned(dir) => dir,
            CacheLocation::Default => self
                .resolved_dir
                .get_or_init(|| resolve_default_dir(&self.config.resolver))
                .await,
        }
    }

    fn may_fall_back(&self, directory: &Path) -> bool {
        matches!(self.config.location, CacheLocation::Default)
            && directory != self.config.resolver.temp_dir
    }

    /// One full lookup-or-compute pass against a fixed directory.
    async fn run_in(
        &self,
        directory: &Path,
        source: &str,
        config: &ConfigValue,
        identifier: &str,
        transform: &dyn Transform,
        oracle: &dyn TimestampOracle,
    ) -> Result<Artifact> {
        let key = compute_cache_key(config, source, identifier);
        tracing::debug!(
            key = %key,
            directory = %directory.display(),
            "Getting cached result"
        );

        if let Some(cached) = self.store.read(directory, &key).await {
            tracing::debug!(key = %key, "Found cached result");
            if is_stale(&cached.external_dependencies, oracle).await {
                tracing::debug!(
                    key = %key,
                    "Discarded cached result due to changes in external dependencies"
                );
            } else {
                return Ok(cached);
            }
        } else {
            tracing::debug!(key = %key, "Missed cached result");
        }

        tracing::debug!("Applying transform");
        let output = transform
            .transform(source, config)
            .await
            .map_err(Error::Transform)?;

        let mut artifact = Artifact::from_output(output, source);
        fill_timestamps(&mut artifact.external_dependencies, oracle).await;

        tracing::debug!(key = %key, "Caching result");
        self.store
            .write(directory, &key, &artifact)
            .await
            .map_err(|err| Error::CacheWrite {
                path: self.store.entry_path(directory, &key),
                source: err,
            })?;
        tracing::debug!(key = %key, "Cached result");

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::new();
        assert!(matches!(config.location, CacheLocation::Default));
        assert!(config.compress);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_directory("/tmp/entries")
            .with_compression(false);

        assert!(
            matches!(config.location, CacheLocation::Pinned(ref dir) if dir == Path::new("/tmp/entries"))
        );
        assert!(!config.compress);
    }

    #[test]
    fn test_version_identifier_shape() {
        let identifier = version_identifier("8.0.0");
        assert!(identifier.starts_with("core8.0.0,loader"));
        assert!(identifier.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_output_drops_dependency_bookkeeping() {
        let artifact = Artifact {
            code: "code".to_string(),
            map: None,
            metadata: None,
            external_dependencies: vec![crate::artifact::ExternalDependency::new("/dep")],
        };

        let output = CacheOutput::from(artifact);
        assert_eq!(output.code, "code");
        assert_eq!(output.map, None);
        assert_eq!(output.metadata, None);
    }
}
