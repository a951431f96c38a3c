#![cfg_attr(docsrs, feature(doc_cfg))]

//! # garner
//!
//! Persistent content-addressed result cache for transpiler integrations.
//!
//! Feeds source files through an external transform and caches the result on
//! disk, keyed by a BLAKE3 fingerprint of the configuration, the source text,
//! and a caller-supplied identifier. Repeated builds skip the transform for
//! unchanged inputs, with correctness guarantees around configuration
//! changes, external file dependencies, and concurrent workers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use garner::{
//!     Cache, CacheConfig, ConfigValue, FsOracle, Transform, TransformError, TransformOutput,
//! };
//!
//! #[derive(Debug)]
//! struct Upper;
//!
//! #[async_trait]
//! impl Transform for Upper {
//!     async fn transform(
//!         &self,
//!         source: &str,
//!         _config: &ConfigValue,
//!     ) -> Result<TransformOutput, TransformError> {
//!         Ok(TransformOutput::new(source.to_uppercase()))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> garner::Result<()> {
//! let cache = Cache::new(CacheConfig::new().with_directory(".cache/garner"));
//! let output = cache
//!     .get_or_compute(
//!         "const x = 1;",
//!         &ConfigValue::Null,
//!         &garner::version_identifier("8.0.0"),
//!         &Upper,
//!         &FsOracle,
//!     )
//!     .await?;
//! assert_eq!(output.code, "CONST X = 1;");
//! # Ok(()) }
//! ```
//!
//! The second identical call returns the stored result without invoking the
//! transform. Entries live one file per key under the configured directory;
//! the directory can be deleted wholesale at any time.

use std::path::PathBuf;

pub mod artifact;
pub mod cache;
pub mod key;
pub mod oracle;
pub mod resolver;
pub mod serialize;
pub mod staleness;
pub mod store;
pub mod transform;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use artifact::{Artifact, ExternalDependency, SourceMap};
pub use cache::{Cache, CacheConfig, CacheLocation, CacheOutput, version_identifier};
pub use key::{CacheKey, compute_cache_key};
pub use oracle::{FileStamp, FsOracle, TimestampOracle};
pub use resolver::{CACHE_DIR_ENV, ResolverInputs, resolve_default_dir};
pub use serialize::{ConfigValue, ToConfigValue, stable_string};
pub use staleness::{fill_timestamps, is_stale};
pub use store::ArtifactStore;
pub use transform::{Transform, TransformError, TransformOutput};

/// Error types for cache operations.
///
/// Cache read failures and staleness-check failures never surface here;
/// both downgrade to a miss or a recompute. The only cache-originated error
/// a caller can observe is [`Error::CacheWrite`], after the
/// temporary-directory fallback is exhausted or inapplicable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external transform failed on a cache-miss input.
    ///
    /// Surfaced verbatim; never retried, never cached.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A cache entry could not be persisted.
    #[error("Failed to write cache entry {}: {source}", .path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Transform(_) => "TRANSFORM_ERROR",
            Error::CacheWrite { .. } => "CACHE_WRITE_FAILED",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::CacheWrite { path, .. } => Some(Box::new(format!(
                "Could not persist a cache entry at '{}'.\nCheck disk space and permissions, or point the cache at a writable directory.",
                path.display()
            ))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_displays_verbatim() {
        let err = Error::from(TransformError::with_code_frame(
            "Unexpected token (1:7)",
            "> 1 | const x = ;",
        ));

        assert_eq!(err.to_string(), "Unexpected token (1:7)\n\n> 1 | const x = ;");
    }

    #[test]
    fn test_cache_write_error_names_the_entry() {
        let err = Error::CacheWrite {
            path: PathBuf::from("/cache/abc.json.gz"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let rendered = err.to_string();
        assert!(rendered.contains("/cache/abc.json.gz"));
        assert!(rendered.contains("denied"));
    }

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic;

        let write = Error::CacheWrite {
            path: PathBuf::from("/cache/abc.json.gz"),
            source: std::io::Error::other("boom"),
        };
        assert_eq!(write.code().map(|c| c.to_string()).as_deref(), Some("CACHE_WRITE_FAILED"));
        assert!(write.help().is_some());

        let transform = Error::from(TransformError::new("bad input"));
        assert_eq!(
            transform.code().map(|c| c.to_string()).as_deref(),
            Some("TRANSFORM_ERROR")
        );
        assert!(transform.help().is_none());
    }
}
