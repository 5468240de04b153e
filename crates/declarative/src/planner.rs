//! Execution planner - builds tiered resource execution plans

use crate::resource::{BoxedResource, Resource};
use std::collections::BTreeMap;

/// An execution plan with resources grouped by dependency tier
pub struct ExecutionPlan {
    tiers: BTreeMap<usize, Vec<BoxedResource>>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            tiers: BTreeMap::new(),
        }
    }

    /// Add a resource to the plan, placing it by its tier
    pub fn add_resource(&mut self, resource: BoxedResource) {
        self.tiers.entry(resource.tier()).or_default().push(resource);
    }

    /// Tiers in apply order (lowest first)
    pub fn tiers(&self) -> impl DoubleEndedIterator<Item = (usize, &[BoxedResource])> {
        self.tiers
            .iter()
            .map(|(tier, resources)| (*tier, resources.as_slice()))
    }

    /// Every resource, in apply order
    pub fn resources(&self) -> impl Iterator<Item = &BoxedResource> {
        self.tiers.values().flatten()
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        let tiers = self
            .tiers
            .into_iter()
            .map(|(tier, resources)| {
                let kept: Vec<_> = resources
                    .into_iter()
                    .filter(|r| predicate(r.as_ref()))
                    .collect();
                (tier, kept)
            })
            .filter(|(_, resources)| !resources.is_empty())
            .collect();
        Self { tiers }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.total_resources() == 0
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((resource_type, name)) if !name.contains('.') => {
            (Some(resource_type.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow plural aliases
        let matches_type = match rt {
            "buckets" => resource.resource_type() == "bucket",
            "tests" => resource.resource_type() == "test",
            "environments" | "envs" | "env" => resource.resource_type() == "environment",
            _ => resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name {
        let id = resource.id();
        let own_name = id.split_once('.').map_or(id.as_str(), |(_, name)| name);
        if own_name != n && id != n {
            return false;
        }
    }

    true
}
