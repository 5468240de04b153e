//! Diff computation for resources

use crate::context::ApplyContext;
use crate::resource::Resource;
use crate::types::ResourceState;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Dependency tier
    pub tier: usize,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource, ctx: &ApplyContext) -> Result<Option<Self>> {
        let current = resource
            .current_state(ctx)
            .with_context(|| format!("Failed to read state of {}", resource.id()))?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            tier: resource.tier(),
            current,
            desired,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff requires deleting and recreating the resource
    pub fn is_replacement(&self) -> bool {
        matches!(self.current, ResourceState::Replace { .. })
    }

    /// Check if this diff represents an in-place modification
    pub fn is_modification(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Modified { .. }, _) | (_, ResourceState::Modified { .. })
        )
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between current and desired
/// state. A resource whose state cannot be read fails the whole computation.
pub fn compute_diffs(resources: &[Box<dyn Resource>], ctx: &ApplyContext) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for resource in resources {
        if let Some(diff) = ResourceDiff::from_resource(resource.as_ref(), ctx)? {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify in place
    pub modifications: usize,
    /// Number of resources to recreate
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else if diff.is_replacement() {
                summary.replacements += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(
    diffs: &[ResourceDiff],
) -> std::collections::BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: std::collections::BTreeMap<String, Vec<&ResourceDiff>> =
        std::collections::BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(current: ResourceState, desired: ResourceState) -> ResourceDiff {
        ResourceDiff {
            resource_id: "test.smoke".into(),
            resource_type: "test".into(),
            description: "Test smoke".into(),
            tier: 1,
            current,
            desired,
        }
    }

    fn present() -> ResourceState {
        ResourceState::Present { details: None }
    }

    #[test]
    fn test_diff_classification() {
        assert!(diff(ResourceState::Absent, present()).is_addition());
        assert!(diff(present(), ResourceState::Absent).is_removal());
        assert!(
            diff(
                ResourceState::Replace {
                    reason: "name changed".into()
                },
                present()
            )
            .is_replacement()
        );
        assert!(
            diff(
                ResourceState::Modified {
                    from: "a".into(),
                    to: "b".into()
                },
                present()
            )
            .is_modification()
        );
    }

    #[test]
    fn test_summary_and_grouping() {
        let diffs = vec![
            diff(ResourceState::Absent, present()),
            diff(present(), ResourceState::Absent),
            diff(
                ResourceState::Replace {
                    reason: "bucket changed".into(),
                },
                present(),
            ),
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.modifications, 0);
        assert!(summary.has_changes());

        let groups = group_by_type(&diffs);
        assert_eq!(groups["test"].len(), 3);
    }
}
