//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging remote systems to match it.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed, addressed as `type.name`
//! - **ResourceState**: The current or desired state of a resource
//! - **StateStore**: Tracked identifiers of resources that exist remotely
//! - **ExecutionPlan**: A plan grouping resources by dependency tier
//! - **Executor**: Applies tiers in order, resources within a tier in parallel;
//!   resources whose desired state is absent are removed last, highest tier first
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{AutoConfirm, ExecutionPlan, ExecuteOptions, MemoryState, NoProgress, execute};
//!
//! let state = MemoryState::new();
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(BucketResource::new("main")));
//! plan.add_resource(Box::new(TestResource::new("smoke", "bucket.main")));
//!
//! // Buckets (tier 0) are created before tests (tier 1).
//! let summary = execute(plan, ExecuteOptions::default(), &state, &mut NoProgress, &mut AutoConfirm)?;
//! assert!(summary.is_success());
//! ```
//!
//! ## Callback Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`StateStore`]: Persists tracked identifiers
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or storage formats.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod state;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{destroy, execute, plan_diffs, refresh};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use state::{MemoryState, StateStore, Tracked};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
