//! The cached unit of work and its wire format.
//!
//! An [`Artifact`] is what a transform produced for one (configuration,
//! source, identifier) triple: code, an optional source map, optional
//! metadata, and the external files that influenced the output. Artifacts
//! serialize to JSON with the field names the cache files use on disk.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::transform::TransformOutput;

/// Cached transform result.
///
/// Immutable once constructed except for the lazy timestamp fill on
/// `external_dependencies` right before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Transformed source text.
    pub code: String,

    /// Source map, when the transform produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<SourceMap>,

    /// Opaque metadata from the transform, passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// Files outside the normal input that influenced the output, with the
    /// timestamps they had when this artifact was cached.
    #[serde(default)]
    pub external_dependencies: Vec<ExternalDependency>,
}

impl Artifact {
    /// Build an artifact from a fresh transform output.
    ///
    /// Normalizes the reported dependency paths (de-duplicated, sorted,
    /// timestamps unfilled), treats explicit-null metadata as absent, and
    /// embeds the original source into the map's `sourcesContent` when the
    /// transform left it out.
    pub fn from_output(output: TransformOutput, source: &str) -> Self {
        let TransformOutput {
            code,
            mut map,
            metadata,
            external_dependencies,
        } = output;

        if let Some(map) = map.as_mut() {
            map.embed_source(source);
        }

        // An explicit JSON null reads back from disk as an absent field;
        // normalizing here keeps the computing call and later hits identical.
        let metadata = metadata.filter(|value| !value.is_null());

        let paths: BTreeSet<PathBuf> = external_dependencies.into_iter().collect();

        Self {
            code,
            map,
            metadata,
            external_dependencies: paths.into_iter().map(ExternalDependency::new).collect(),
        }
    }
}

/// A source map in the standard v3 shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
}

impl SourceMap {
    /// Embed the original source when `sourcesContent` is missing or empty,
    /// so the stored map stays usable without the input file.
    pub fn embed_source(&mut self, source: &str) {
        let missing = self
            .sources_content
            .as_ref()
            .is_none_or(|content| content.is_empty());
        if missing {
            self.sources_content = Some(vec![source.to_string()]);
        }
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self {
            version: 3,
            file: None,
            source_root: None,
            sources: Vec::new(),
            sources_content: None,
            names: Vec::new(),
            mappings: String::new(),
        }
    }
}

/// One tracked external file.
///
/// Serializes as a `[path]` or `[path, timestamp]` tuple. The timestamp is
/// absent until the lazy fill right before the artifact is persisted, and
/// stays absent when the file could not be statted at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDependency {
    pub path: PathBuf,
    /// Last-modified marker in milliseconds, as reported by the oracle.
    pub timestamp: Option<u64>,
}

impl ExternalDependency {
    /// A dependency with no recorded timestamp yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp: None,
        }
    }

    /// A dependency with a recorded timestamp.
    pub fn with_timestamp(path: impl Into<PathBuf>, timestamp: u64) -> Self {
        Self {
            path: path.into(),
            timestamp: Some(timestamp),
        }
    }
}

impl Serialize for ExternalDependency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.timestamp.is_some() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.path)?;
        if let Some(timestamp) = self.timestamp {
            seq.serialize_element(&timestamp)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ExternalDependency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DependencyVisitor;

        impl<'de> Visitor<'de> for DependencyVisitor {
            type Value = ExternalDependency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [path, timestamp?] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let path: PathBuf = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let timestamp: Option<u64> = seq.next_element()?;
                Ok(ExternalDependency { path, timestamp })
            }
        }

        deserializer.deserialize_seq(DependencyVisitor)
    }
}
