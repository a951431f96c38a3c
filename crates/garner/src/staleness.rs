//! Staleness detection for recorded external dependencies.
//!
//! Runs on every cache hit before the cached artifact is trusted. Only
//! timestamps obtained through the caller's oracle are consulted; file
//! contents are never read here.

use crate::artifact::ExternalDependency;
use crate::oracle::TimestampOracle;

/// True when any recorded dependency no longer matches what the oracle
/// reports now.
///
/// An oracle error means the file is gone or unreadable; that counts as
/// changed and short-circuits the remaining lookups. A dependency recorded
/// without a timestamp can never match and is therefore always stale.
pub async fn is_stale(deps: &[ExternalDependency], oracle: &dyn TimestampOracle) -> bool {
    for dep in deps {
        match oracle.timestamp(&dep.path).await {
            Ok(stamp) => {
                if dep.timestamp != Some(stamp.timestamp) {
                    return true;
                }
            }
            Err(_) => return true,
        }
    }
    false
}

/// Record the current timestamp for each dependency.
///
/// Best-effort: a failed lookup leaves that entry without a timestamp
/// rather than failing the operation. The dependency may legitimately not
/// exist yet; the unfilled entry then reads as stale on the next hit.
pub async fn fill_timestamps(deps: &mut [ExternalDependency], oracle: &dyn TimestampOracle) {
    for dep in deps.iter_mut() {
        if let Ok(stamp) = oracle.timestamp(&dep.path).await {
            dep.timestamp = Some(stamp.timestamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FileStamp;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Oracle scripted from a path -> timestamp map; unknown paths error.
    #[derive(Debug, Default)]
    struct MapOracle {
        stamps: HashMap<PathBuf, u64>,
        lookups: AtomicUsize,
    }

    impl MapOracle {
        fn with(entries: &[(&str, u64)]) -> Self {
            Self {
                stamps: entries
                    .iter()
                    .map(|(path, stamp)| (PathBuf::from(path), *stamp))
                    .collect(),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TimestampOracle for MapOracle {
        async fn timestamp(&self, path: &Path) -> io::Result<FileStamp> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.stamps
                .get(path)
                .copied()
                .map(FileStamp::new)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unscripted path"))
        }
    }

    #[tokio::test]
    async fn test_no_dependencies_is_fresh() {
        let oracle = MapOracle::default();
        assert!(!is_stale(&[], &oracle).await);
    }

    #[tokio::test]
    async fn test_matching_timestamps_are_fresh() {
        let oracle = MapOracle::with(&[("/a.json", 100), ("/b.json", 200)]);
        let deps = vec![
            ExternalDependency::with_timestamp("/a.json", 100),
            ExternalDependency::with_timestamp("/b.json", 200),
        ];

        assert!(!is_stale(&deps, &oracle).await);
    }

    #[tokio::test]
    async fn test_changed_timestamp_is_stale() {
        let oracle = MapOracle::with(&[("/a.json", 100), ("/b.json", 999)]);
        let deps = vec![
            ExternalDependency::with_timestamp("/a.json", 100),
            ExternalDependency::with_timestamp("/b.json", 200),
        ];

        assert!(is_stale(&deps, &oracle).await);
    }

    #[tokio::test]
    async fn test_unfilled_timestamp_is_stale() {
        let oracle = MapOracle::with(&[("/a.json", 100)]);
        let deps = vec![ExternalDependency::new("/a.json")];

        assert!(is_stale(&deps, &oracle).await);
    }

    #[tokio::test]
    async fn test_oracle_error_is_stale_and_short_circuits() {
        let oracle = MapOracle::with(&[("/b.json", 200)]);
        let deps = vec![
            ExternalDependency::with_timestamp("/gone.json", 100),
            ExternalDependency::with_timestamp("/b.json", 200),
        ];

        assert!(is_stale(&deps, &oracle).await);
        assert_eq!(oracle.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fill_records_available_timestamps() {
        let oracle = MapOracle::with(&[("/a.json", 100)]);
        let mut deps = vec![
            ExternalDependency::new("/a.json"),
            ExternalDependency::new("/missing.json"),
        ];

        fill_timestamps(&mut deps, &oracle).await;

        assert_eq!(deps[0].timestamp, Some(100));
        assert_eq!(deps[1].timestamp, None);
    }

    #[tokio::test]
    async fn test_fill_overwrites_previous_timestamp() {
        let oracle = MapOracle::with(&[("/a.json", 300)]);
        let mut deps = vec![ExternalDependency::with_timestamp("/a.json", 100)];

        fill_timestamps(&mut deps, &oracle).await;

        assert_eq!(deps[0].timestamp, Some(300));
    }
}
