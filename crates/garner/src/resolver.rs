//! Cache directory resolution.
//!
//! Used only when the caller did not pin an explicit directory. Precedence:
//! the `CACHE_DIR` environment override, then a discovered project root
//! (`<root>/node_modules/.cache/<namespace>`), then the process-wide
//! temporary directory. Resolution never fails; it degrades to the
//! temporary directory.

use std::path::{Path, PathBuf};

/// Environment variable naming a shared cache root.
pub const CACHE_DIR_ENV: &str = "CACHE_DIR";

/// Default per-tool subdirectory under shared cache roots.
pub const DEFAULT_NAMESPACE: &str = env!("CARGO_PKG_NAME");

/// Values of `CACHE_DIR` that mean "enabled" rather than naming a path.
const BOOLEAN_SENTINELS: [&str; 4] = ["true", "false", "1", "0"];

/// Everything directory resolution consults, captured as plain values.
///
/// Populated from the real process environment exactly once via
/// [`ResolverInputs::from_env`]; tests construct substitutes directly
/// instead of mutating the process environment.
#[derive(Debug, Clone)]
pub struct ResolverInputs {
    /// Value of `CACHE_DIR` at capture time, if set.
    pub env_cache_dir: Option<String>,
    /// Directory the project-root walk starts from.
    pub start_dir: PathBuf,
    /// Per-tool subdirectory name under shared cache roots.
    pub namespace: String,
    /// Last-resort location.
    pub temp_dir: PathBuf,
}

impl ResolverInputs {
    /// Capture the process environment: `CACHE_DIR`, the current directory,
    /// the default namespace, and the system temporary directory.
    pub fn from_env() -> Self {
        Self {
            env_cache_dir: std::env::var(CACHE_DIR_ENV).ok(),
            start_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            namespace: DEFAULT_NAMESPACE.to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_start_dir(mut self, start_dir: impl Into<PathBuf>) -> Self {
        self.start_dir = start_dir.into();
        self
    }
}

impl Default for ResolverInputs {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Resolve the default cache directory from the captured inputs.
pub async fn resolve_default_dir(inputs: &ResolverInputs) -> PathBuf {
    if let Some(root) = inputs.env_cache_dir.as_deref() {
        // An empty or boolean-valued setting does not name a usable path.
        if !root.is_empty() && !BOOLEAN_SENTINELS.contains(&root) {
            return PathBuf::from(root).join(&inputs.namespace);
        }
    }

    if let Some(project_root) = find_project_root(&inputs.start_dir).await {
        return project_root
            .join("node_modules")
            .join(".cache")
            .join(&inputs.namespace);
    }

    inputs.temp_dir.clone()
}

/// Nearest ancestor of `start` (inclusive) containing a `package.json`
/// manifest.
async fn find_project_root(start: &Path) -> Option<PathBuf> {
    for ancestor in start.ancestors() {
        let manifest = ancestor.join("package.json");
        if tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            return Some(ancestor.to_path_buf());
        }
    }
    None
}
