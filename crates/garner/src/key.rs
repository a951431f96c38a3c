//! Cache key computation using BLAKE3 content-addressed hashing.
//!
//! The key is a deterministic hash of everything that can change a transform
//! result: the serialized configuration, the source text, and the caller's
//! identifier string. Any difference in any of the three yields a different
//! key, so invalidation is automatic.

use blake3::Hasher;

use crate::serialize::{ConfigValue, stable_string};

/// Content-addressed cache key (BLAKE3 hash, 64 hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a cache key from a hex string.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the cache key as a hex string.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the cache key for a (configuration, source, identifier) triple.
///
/// The key is a BLAKE3 hash of:
/// 1. The stable serialization of the configuration
/// 2. The raw source text
/// 3. The identifier string (version salt supplied by the caller)
///
/// Pure and side-effect free; safe to call concurrently.
pub fn compute_cache_key(config: &ConfigValue, source: &str, identifier: &str) -> CacheKey {
    let mut hasher = Hasher::new();

    hasher.update(stable_string(config).as_bytes());
    hasher.update(b"\0"); // separator
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(identifier.as_bytes());

    let hash = hasher.finalize();
    CacheKey(hash.to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn config(entries: Vec<(&str, ConfigValue)>) -> ConfigValue {
        ConfigValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<IndexMap<_, _>>(),
        )
    }

    #[test]
    fn test_cache_key_deterministic() {
        let cfg = config(vec![("compact", true.into())]);

        let key1 = compute_cache_key(&cfg, "const x = 1;", "v1");
        let key2 = compute_cache_key(&cfg, "const x = 1;", "v1");

        assert_eq!(key1, key2);
        assert_eq!(key1.as_hex().len(), 64);
    }

    #[test]
    fn test_cache_key_ignores_property_insertion_order() {
        let forward = config(vec![("a", 1i64.into()), ("b", 2i64.into())]);
        let reversed = config(vec![("b", 2i64.into()), ("a", 1i64.into())]);

        let key1 = compute_cache_key(&forward, "src", "id");
        let key2 = compute_cache_key(&reversed, "src", "id");

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_cache_key_changes_on_source_change() {
        let cfg = config(vec![]);

        let key1 = compute_cache_key(&cfg, "const x = 1;", "v1");
        let key2 = compute_cache_key(&cfg, "const x = 2;", "v1");

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_changes_on_identifier_change() {
        let cfg = config(vec![]);

        let key1 = compute_cache_key(&cfg, "const x = 1;", "v1");
        let key2 = compute_cache_key(&cfg, "const x = 1;", "v2");

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_changes_on_config_change() {
        let key1 = compute_cache_key(&config(vec![("compact", true.into())]), "src", "id");
        let key2 = compute_cache_key(&config(vec![("compact", false.into())]), "src", "id");

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_separates_fields() {
        // The separator prevents a config suffix from aliasing a source
        // prefix.
        let key1 = compute_cache_key(&"ab".into(), "c", "id");
        let key2 = compute_cache_key(&"a".into(), "bc", "id");

        assert_ne!(key1, key2);
    }
}
