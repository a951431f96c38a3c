//! The external transform capability.
//!
//! The cache treats the compiler as a black box behind the [`Transform`]
//! trait: source text and configuration in, transformed output or a
//! [`TransformError`] out. The cache never retries, rewrites, or caches a
//! transform failure.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::artifact::SourceMap;
use crate::serialize::ConfigValue;

/// An async transform backend.
///
/// Implementations are expected to be deterministic for identical
/// `(source, config)` inputs; the cache does not enforce this.
#[async_trait]
pub trait Transform: Send + Sync + std::fmt::Debug {
    async fn transform(
        &self,
        source: &str,
        config: &ConfigValue,
    ) -> Result<TransformOutput, TransformError>;
}

/// What a transform produced for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    /// Transformed source text.
    pub code: String,

    /// Source map, when the backend emits one.
    pub map: Option<SourceMap>,

    /// Opaque backend metadata, passed through to the caller unchanged.
    pub metadata: Option<serde_json::Value>,

    /// Files outside the compiled input that influenced this output.
    /// May contain duplicates and arrive in any order; the cache
    /// normalizes the list before storing it.
    pub external_dependencies: Vec<PathBuf>,
}

impl TransformOutput {
    /// Output carrying only code, with no map, metadata, or dependencies.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
            metadata: None,
            external_dependencies: Vec::new(),
        }
    }
}

/// A compile failure reported by the transform backend.
///
/// Carries the compiler's message and, when available, the annotated code
/// frame pointing at the offending input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub message: String,
    pub code_frame: Option<String>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code_frame: None,
        }
    }

    pub fn with_code_frame(message: impl Into<String>, code_frame: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code_frame: Some(code_frame.into()),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(frame) = &self.code_frame {
            write!(f, "\n\n{frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransformError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_message_only() {
        let err = TransformError::new("Unexpected token (1:7)");
        assert_eq!(err.to_string(), "Unexpected token (1:7)");
    }

    #[test]
    fn test_display_appends_code_frame() {
        let err = TransformError::with_code_frame(
            "Unexpected token (1:7)",
            "> 1 | const x = ;\n    |           ^",
        );
        assert_eq!(
            err.to_string(),
            "Unexpected token (1:7)\n\n> 1 | const x = ;\n    |           ^"
        );
    }
}
