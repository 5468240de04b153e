use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{StateStore, Tracked};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// On-disk layout of the state file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateData {
    /// Format version
    pub version: u32,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Tracked resources by address
    #[serde(default)]
    pub resources: BTreeMap<String, Tracked>,
}

impl Default for StateData {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

/// State file shared by all workers of a run
///
/// Every change is written through to disk so an interrupted run keeps the
/// identifiers of what it already created.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    data: Mutex<StateData>,
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load state from disk, or start empty if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read state file: {}", path.display()))?;
            let data: StateData = toml::from_str(&content)
                .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
            if data.version > STATE_VERSION {
                bail!(
                    "State file {} has version {}, newer than supported version {}",
                    path.display(),
                    data.version,
                    STATE_VERSION
                );
            }
            log::debug!("Loaded state from {}", path.display());
            data
        } else {
            log::debug!("State file does not exist, using empty state");
            StateData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> StateData {
        self.data().clone()
    }

    fn write(path: &Path, data: &StateData) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(data).context("Failed to serialize state to TOML")?;

        // Write next to the target and rename, so a crash never leaves half a file.
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    fn data(&self) -> MutexGuard<'_, StateData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for StateFile {
    fn get(&self, address: &str) -> Option<Tracked> {
        self.data().resources.get(address).cloned()
    }

    fn put(&self, address: &str, tracked: Tracked) -> Result<()> {
        let mut data = self.data();
        log::debug!("Tracking {address} as {} {}", tracked.kind, tracked.id);
        data.resources.insert(address.to_string(), tracked);
        data.last_updated = Utc::now();
        Self::write(&self.path, &data)
    }

    fn remove(&self, address: &str) -> Result<Option<Tracked>> {
        let mut data = self.data();
        let removed = data.resources.remove(address);
        if removed.is_some() {
            log::debug!("Dropped {address} from state");
            data.last_updated = Utc::now();
            Self::write(&self.path, &data)?;
        }
        Ok(removed)
    }

    fn addresses(&self) -> Vec<String> {
        self.data().resources.keys().cloned().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
