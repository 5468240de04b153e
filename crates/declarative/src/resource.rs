//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (address, description, type)
/// - Ordering (dependency tier)
/// - State detection (current vs desired)
/// - State convergence (apply, destroy)
///
/// # Example
///
/// ```
/// use anyhow::Result;
/// use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Tracked};
///
/// #[derive(Debug)]
/// struct Marker {
///     name: String,
/// }
///
/// impl Resource for Marker {
///     fn id(&self) -> String {
///         format!("marker.{}", self.name)
///     }
///
///     fn description(&self) -> String {
///         format!("Marker {}", self.name)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "marker"
///     }
///
///     fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
///         if ctx.state.contains(&self.id()) {
///             Ok(ResourceState::Present { details: None })
///         } else {
///             Ok(ResourceState::Absent)
///         }
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present { details: None }
///     }
///
///     fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
///         }
///         ctx.state.put(&self.id(), Tracked::new("marker", &self.name))?;
///         Ok(ApplyResult::Created)
///     }
///
///     fn destroy(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
///         match ctx.state.remove(&self.id())? {
///             Some(_) => Ok(ApplyResult::Removed),
///             None => Ok(ApplyResult::NoChange),
///         }
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique address for this resource, e.g. `bucket.main`
    ///
    /// This is the key of the resource in the state store and must be
    /// stable across runs.
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, the first segment of the address
    fn resource_type(&self) -> &'static str;

    /// Dependency tier
    ///
    /// Lower tiers are applied first and destroyed last. Resources in the
    /// same tier must not depend on each other.
    fn tier(&self) -> usize {
        0
    }

    /// Detect the current state of this resource
    ///
    /// An untracked resource, or a tracked one the remote no longer has, is
    /// `Absent`.
    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState>;

    /// Get the desired state for this resource
    ///
    /// This is typically derived from configuration.
    fn desired_state(&self) -> ResourceState;

    /// Check if the resource needs changes to reach desired state
    ///
    /// Default implementation compares current and desired states.
    fn needs_apply(&self, ctx: &ApplyContext) -> Result<bool> {
        let current = self.current_state(ctx)?;
        let desired = self.desired_state();
        Ok(current != desired)
    }

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Check if already in desired state (return NoChange)
    /// 2. Respect ctx.dry_run (return Skipped if true)
    /// 3. Make the necessary changes and record identifiers in ctx.state
    /// 4. Return the appropriate ApplyResult
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;

    /// Remove the resource and drop it from tracked state
    ///
    /// An untracked resource is left alone and reported as NoChange.
    fn destroy(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;

}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
