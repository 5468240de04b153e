//! Tracked state: which resources exist remotely and under which identifiers
//!
//! The engine only knows addresses and opaque identifiers. Persisting them is
//! up to the [`StateStore`] implementation.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// A tracked resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracked {
    /// Resource type, as reported by [`Resource::resource_type`](crate::Resource::resource_type)
    pub kind: String,
    /// Remote identifier assigned on creation
    pub id: String,
    /// Owning identifiers captured at creation time (e.g. `bucket`, `test`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scope: BTreeMap<String, String>,
}

impl Tracked {
    /// Track a resource with no owners
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            scope: BTreeMap::new(),
        }
    }

    /// Record an owning identifier
    pub fn with_owner(mut self, name: &str, id: impl Into<String>) -> Self {
        self.scope.insert(name.to_string(), id.into());
        self
    }

    /// Look up an owning identifier
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.scope.get(name).map(String::as_str)
    }
}

/// Store of tracked resources, keyed by resource address
///
/// Shared by every worker in a tier, so implementations synchronise
/// internally.
pub trait StateStore: Send + Sync {
    /// Get the entry for an address
    fn get(&self, address: &str) -> Option<Tracked>;

    /// Insert or replace the entry for an address
    fn put(&self, address: &str, tracked: Tracked) -> Result<()>;

    /// Drop the entry for an address, returning it if present
    fn remove(&self, address: &str) -> Result<Option<Tracked>>;

    /// All tracked addresses, sorted
    fn addresses(&self) -> Vec<String>;

    /// Whether an address is tracked
    fn contains(&self, address: &str) -> bool {
        self.get(address).is_some()
    }
}

/// In-memory state store
#[derive(Debug, Default)]
pub struct MemoryState {
    entries: Mutex<BTreeMap<String, Tracked>>,
}

impl MemoryState {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Tracked>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryState {
    fn get(&self, address: &str) -> Option<Tracked> {
        self.entries().get(address).cloned()
    }

    fn put(&self, address: &str, tracked: Tracked) -> Result<()> {
        self.entries().insert(address.to_string(), tracked);
        Ok(())
    }

    fn remove(&self, address: &str) -> Result<Option<Tracked>> {
        Ok(self.entries().remove(address))
    }

    fn addresses(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_state_roundtrip() {
        let state = MemoryState::new();
        let tracked = Tracked::new("environment", "e1")
            .with_owner("bucket", "b1")
            .with_owner("test", "t1");

        state.put("environment.staging", tracked.clone()).unwrap();
        assert!(state.contains("environment.staging"));
        assert_eq!(state.get("environment.staging"), Some(tracked.clone()));
        assert_eq!(tracked.owner("test"), Some("t1"));
        assert_eq!(tracked.owner("missing"), None);

        assert_eq!(state.remove("environment.staging").unwrap(), Some(tracked));
        assert!(state.remove("environment.staging").unwrap().is_none());
        assert!(state.addresses().is_empty());
    }

    #[test]
    fn test_addresses_sorted() {
        let state = MemoryState::new();
        state.put("test.b", Tracked::new("test", "t2")).unwrap();
        state.put("bucket.a", Tracked::new("bucket", "b1")).unwrap();
        assert_eq!(state.addresses(), vec!["bucket.a", "test.b"]);
    }
}
