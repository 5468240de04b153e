//! Execution planner - turns the manifest and state file into resources

use anyhow::Result;
use declarative::{ExecutionPlan, StateStore};
use std::collections::BTreeSet;

use crate::config::Manifest;
use crate::resource::{
    BucketResource, EnvironmentResource, OrphanResource, SharedClient, TestResource,
};

/// Build the plan for a manifest
///
/// Every declared entry becomes a resource. State entries that are no longer
/// declared are added as orphans so `apply` removes them.
pub fn build_plan(
    manifest: &Manifest,
    state: &dyn StateStore,
    client: &SharedClient,
) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();

    for (name, spec) in &manifest.buckets {
        plan.add_resource(Box::new(BucketResource::new(
            name,
            spec.clone(),
            SharedClient::clone(client),
        )));
    }

    for (name, spec) in &manifest.tests {
        let bucket = manifest.test_bucket(name, spec)?;
        plan.add_resource(Box::new(TestResource::new(
            name,
            spec.clone(),
            bucket,
            SharedClient::clone(client),
        )));
    }

    for (name, spec) in &manifest.environments {
        let (bucket, test) = manifest.environment_owners(name, spec)?;
        plan.add_resource(Box::new(EnvironmentResource::new(
            name,
            spec.clone(),
            bucket,
            test,
            SharedClient::clone(client),
        )));
    }

    let declared: BTreeSet<String> = manifest.addresses().into_iter().collect();
    for address in state.addresses() {
        if declared.contains(&address) {
            continue;
        }
        if let Some(tracked) = state.get(&address) {
            log::debug!("{address} is tracked but no longer declared");
            plan.add_resource(Box::new(OrphanResource::new(
                &address,
                tracked,
                SharedClient::clone(client),
            )));
        }
    }

    log::debug!("Planned {} resource(s)", plan.total_resources());
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tests::mock_client;
    use declarative::{MemoryState, Tracked};

    const MANIFEST: &str = r#"
        [buckets.main]
        name = "Payments"
        team_uuid = "T1"

        [tests.checkout]
        bucket = "main"
        name = "Checkout"

        [environments.staging]
        test = "checkout"
        name = "Staging"
    "#;

    #[test]
    fn test_plan_tiers_follow_ownership() {
        let (client, _) = mock_client();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let state = MemoryState::new();
        let plan = build_plan(&manifest, &state, &client).unwrap();

        let tiers: Vec<(usize, Vec<String>)> = plan
            .tiers()
            .map(|(tier, resources)| (tier, resources.iter().map(|r| r.id()).collect()))
            .collect();
        assert_eq!(
            tiers,
            vec![
                (0, vec!["bucket.main".to_string()]),
                (1, vec!["test.checkout".to_string()]),
                (2, vec!["environment.staging".to_string()]),
            ]
        );
    }

    #[test]
    fn test_undeclared_state_entries_become_orphans() {
        let (client, _) = mock_client();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let state = MemoryState::new();
        state.put("bucket.main", Tracked::new("bucket", "b1")).unwrap();
        state
            .put("test.legacy", Tracked::new("test", "t7").with_owner("bucket", "b1"))
            .unwrap();

        let plan = build_plan(&manifest, &state, &client).unwrap();
        assert_eq!(plan.total_resources(), 4);
        let orphan = plan.resources().find(|r| r.id() == "test.legacy").unwrap();
        assert_eq!(orphan.tier(), 1);
        assert!(orphan.desired_state().is_absent());
    }
}
