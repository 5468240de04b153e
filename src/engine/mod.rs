//! Execution engine for runscope-sync
//!
//! The engine orchestrates:
//! 1. Planning - Build resources from the manifest and state file
//! 2. Diffing - Compare tracked entities with the manifest
//! 3. Executing - Apply changes tier by tier with parallelism within a tier

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::display_diff;
pub use executor::ExecuteOptions;
pub use planner::build_plan;
