//! Centralized path resolution for runscope-sync
//!
//! # Environment Variables
//!
//! - `RUNSCOPE_SYNC_MANIFEST` - Override the manifest path
//! - `RUNSCOPE_SYNC_STATE` - Override the state file path
//!
//! # Path Resolution Priority
//!
//! For manifest_path():
//! 1. `--manifest` flag
//! 2. `RUNSCOPE_SYNC_MANIFEST` environment variable
//! 3. `runscope.toml` in the working directory
//!
//! For state_path():
//! 1. `--state` flag
//! 2. `RUNSCOPE_SYNC_STATE` environment variable
//! 3. `runscope.state.toml` next to the manifest

use std::path::{Path, PathBuf};

/// Environment variable for manifest path override
pub const ENV_MANIFEST: &str = "RUNSCOPE_SYNC_MANIFEST";

/// Environment variable for state file path override
pub const ENV_STATE: &str = "RUNSCOPE_SYNC_STATE";

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = "runscope.toml";

/// Default state file name
pub const DEFAULT_STATE: &str = "runscope.state.toml";

/// Get the manifest path
pub fn manifest_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return expand(&path.to_string_lossy());
    }

    if let Ok(path) = std::env::var(ENV_MANIFEST) {
        let path = expand(&path);
        log::debug!("Using manifest from {}: {}", ENV_MANIFEST, path.display());
        return path;
    }

    PathBuf::from(DEFAULT_MANIFEST)
}

/// Get the state file path for a manifest
pub fn state_path(flag: Option<&Path>, manifest: &Path) -> PathBuf {
    if let Some(path) = flag {
        return expand(&path.to_string_lossy());
    }

    if let Ok(path) = std::env::var(ENV_STATE) {
        let path = expand(&path);
        log::debug!("Using state file from {}: {}", ENV_STATE, path.display());
        return path;
    }

    manifest.with_file_name(DEFAULT_STATE)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: each test uses its own variable, nothing else reads it concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_flag_wins() {
        let path = manifest_path(Some(Path::new("/srv/monitoring.toml")));
        assert_eq!(path, PathBuf::from("/srv/monitoring.toml"));
    }

    #[test]
    fn test_manifest_env_override() {
        with_env_var(ENV_MANIFEST, "/custom/runscope.toml", || {
            assert_eq!(manifest_path(None), PathBuf::from("/custom/runscope.toml"));
        });
    }

    #[test]
    fn test_state_env_override() {
        with_env_var(ENV_STATE, "/custom/state.toml", || {
            let path = state_path(None, Path::new("runscope.toml"));
            assert_eq!(path, PathBuf::from("/custom/state.toml"));
        });
    }

    #[test]
    fn test_state_defaults_next_to_manifest() {
        let path = state_path(
            Some(Path::new("/srv/ops/state.toml")),
            Path::new("/srv/ops/runscope.toml"),
        );
        assert_eq!(path, PathBuf::from("/srv/ops/state.toml"));

        let manifest = Path::new("/srv/ops/runscope.toml");
        assert_eq!(
            manifest.with_file_name(DEFAULT_STATE),
            PathBuf::from("/srv/ops/runscope.state.toml")
        );
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/ops/runscope.toml");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("ops").join("runscope.toml"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
