//! Apply context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of progress bars, prompts, etc.

use crate::state::StateStore;
use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when starting to apply the resources of one tier
    fn on_tier_start(&mut self, tier: usize, count: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a tier completes
    fn on_tier_complete(&mut self);
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_tier_start(&mut self, _tier: usize, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_tier_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Context passed to resource operations
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Tracked state, used to resolve identifiers and record new ones
    pub state: &'a dyn StateStore,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(dry_run: bool, state: &'a dyn StateStore) -> Self {
        Self { dry_run, state }
    }

    /// Get the tracked identifier for an address, or error if untracked
    pub fn require_id(&self, address: &str) -> Result<String> {
        self.state
            .get(address)
            .map(|tracked| tracked.id)
            .ok_or_else(|| anyhow::anyhow!("{address} is not tracked; apply it first"))
    }
}
