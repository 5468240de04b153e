//! Execution engine - applies resources tier by tier, in parallel within a tier

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::{ResourceDiff, compute_diffs};
use crate::planner::ExecutionPlan;
use crate::resource::BoxedResource;
use crate::state::StateStore;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;

/// What to do with each resource of a batch
#[derive(Debug, Clone, Copy)]
enum Operation {
    Apply,
    Destroy,
}

/// Compute the diffs of every resource in the plan, in tier order
pub fn plan_diffs(plan: &ExecutionPlan, state: &dyn StateStore) -> Result<Vec<ResourceDiff>> {
    let ctx = ApplyContext::new(true, state);
    let mut diffs = Vec::new();
    for (_, resources) in plan.tiers() {
        diffs.extend(compute_diffs(resources, &ctx)?);
    }
    Ok(diffs)
}

/// Execute a plan with the given options and callbacks
///
/// Tiers run in ascending order. Each tier is re-diffed just before it runs,
/// so it sees the identifiers recorded by the tiers before it. Resources
/// whose desired state is `Absent` are handled afterwards in descending tier
/// order. A failure inside a tier is recorded in the summary and does not
/// stop the run.
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs)
/// * `state` - Tracked state, updated as resources are created and removed
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    state: &dyn StateStore,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total_changes = plan_diffs(&plan, state)?.len();
    if total_changes == 0 {
        return Ok(ExecuteSummary::default());
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm(&format!("Apply {total_changes} change(s)?"))? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    let pool = build_pool(opts.jobs)?;
    let mut summary = ExecuteSummary::default();

    for (tier, resources) in plan.tiers() {
        let kept: Vec<&BoxedResource> = resources
            .iter()
            .filter(|r| !r.desired_state().is_absent())
            .collect();
        converge_tier(&pool, tier, &kept, state, progress, &mut summary);
    }

    // Resources that should no longer exist go last, highest tier first, so
    // nothing is removed while something it owns is still tracked.
    for (tier, resources) in plan.tiers().rev() {
        let retired: Vec<&BoxedResource> = resources
            .iter()
            .filter(|r| r.desired_state().is_absent())
            .collect();
        converge_tier(&pool, tier, &retired, state, progress, &mut summary);
    }

    Ok(summary)
}

/// Re-diff one tier and apply the resources that still differ
fn converge_tier<P: ProgressCallback>(
    pool: &rayon::ThreadPool,
    tier: usize,
    resources: &[&BoxedResource],
    state: &dyn StateStore,
    progress: &mut P,
    summary: &mut ExecuteSummary,
) {
    if resources.is_empty() {
        return;
    }

    let ctx = ApplyContext::new(false, state);
    let diffs: Vec<(&BoxedResource, Result<Option<ResourceDiff>>)> = pool.install(|| {
        resources
            .par_iter()
            .map(|&r| (r, ResourceDiff::from_resource(r.as_ref(), &ctx)))
            .collect()
    });

    let mut pending = Vec::new();
    for (resource, diff) in diffs {
        match diff {
            Ok(Some(_)) => pending.push(resource),
            Ok(None) => summary.add_result(&resource.id(), &ApplyResult::NoChange),
            Err(e) => {
                let result = ApplyResult::Failed {
                    error: format!("{e:#}"),
                };
                progress.on_resource_complete(&resource.id(), &result);
                summary.add_result(&resource.id(), &result);
            }
        }
    }
    if pending.is_empty() {
        return;
    }

    log::debug!("Applying tier {tier}: {} resource(s)", pending.len());
    progress.on_tier_start(tier, pending.len());
    let results = execute_batch(pool, &pending, Operation::Apply, state, progress);
    for (id, result) in &results {
        summary.add_result(id, result);
    }
    progress.on_tier_complete();
}

/// Destroy every tracked resource in the plan, highest tier first
pub fn destroy<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    state: &dyn StateStore,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total = plan
        .resources()
        .filter(|r| state.contains(&r.id()))
        .count();
    if total == 0 {
        return Ok(ExecuteSummary::default());
    }

    if !opts.dry_run && !confirm.confirm(&format!("Destroy {total} resource(s)?"))? {
        return Ok(ExecuteSummary {
            skipped: total,
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    let pool = build_pool(opts.jobs)?;
    let mut summary = ExecuteSummary::default();

    for (tier, resources) in plan.tiers().rev() {
        let pending: Vec<&BoxedResource> = resources
            .iter()
            .filter(|r| state.contains(&r.id()))
            .collect();
        if pending.is_empty() {
            continue;
        }

        log::debug!("Destroying tier {tier}: {} resource(s)", pending.len());
        progress.on_tier_start(tier, pending.len());
        let results = execute_batch(&pool, &pending, Operation::Destroy, state, progress);
        for (id, result) in &results {
            summary.add_result(id, result);
        }
        progress.on_tier_complete();
    }

    Ok(summary)
}

/// Re-read every tracked resource and drop the ones the remote no longer has
///
/// Resources still present count as `no_change`; dropped ones as `removed`.
pub fn refresh(plan: &ExecutionPlan, jobs: usize, state: &dyn StateStore) -> Result<ExecuteSummary> {
    let pool = build_pool(jobs)?;
    let ctx = ApplyContext::new(false, state);
    let tracked: Vec<&BoxedResource> = plan
        .resources()
        .filter(|r| state.contains(&r.id()))
        .collect();

    let results: Vec<(String, ApplyResult)> = pool.install(|| {
        tracked
            .par_iter()
            .map(|resource| {
                let id = resource.id();
                let result = match resource.current_state(&ctx) {
                    Ok(current) if current.is_absent() => match state.remove(&id) {
                        Ok(_) => {
                            log::info!("{id} no longer exists remotely; dropped from state");
                            ApplyResult::Removed
                        }
                        Err(e) => ApplyResult::Failed {
                            error: format!("{e:#}"),
                        },
                    },
                    Ok(_) => ApplyResult::NoChange,
                    Err(e) => ApplyResult::Failed {
                        error: format!("{e:#}"),
                    },
                };
                (id, result)
            })
            .collect()
    });

    let mut summary = ExecuteSummary::default();
    for (id, result) in &results {
        summary.add_result(id, result);
    }
    Ok(summary)
}

fn build_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))
}

/// Execute a batch of resources from the same tier
fn execute_batch<P: ProgressCallback>(
    pool: &rayon::ThreadPool,
    resources: &[&BoxedResource],
    operation: Operation,
    state: &dyn StateStore,
    progress: &mut P,
) -> Vec<(String, ApplyResult)> {
    if pool.current_num_threads() > 1 {
        // The progress callback is not thread-safe, so results are reported
        // once the parallel batch is done.
        let results: Vec<(String, ApplyResult)> = pool.install(|| {
            resources
                .par_iter()
                .map(|r| (r.id(), run_resource(r, operation, state)))
                .collect()
        });
        for (id, result) in &results {
            progress.on_resource_complete(id, result);
        }
        return results;
    }

    let mut results = Vec::with_capacity(resources.len());
    for resource in resources {
        let id = resource.id();
        progress.on_resource_start(&id, &resource.description());
        let result = run_resource(resource, operation, state);
        progress.on_resource_complete(&id, &result);
        results.push((id, result));
    }
    results
}

/// Apply or destroy a single resource
fn run_resource(resource: &BoxedResource, operation: Operation, state: &dyn StateStore) -> ApplyResult {
    let mut ctx = ApplyContext::new(false, state);

    let outcome = match operation {
        Operation::Apply => resource.apply(&mut ctx),
        Operation::Destroy => resource.destroy(&mut ctx),
    };

    match outcome {
        Ok(result) => result,
        Err(e) => {
            log::debug!("{} failed: {e:#}", resource.id());
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, NoProgress};
    use crate::resource::Resource;
    use crate::state::{MemoryState, Tracked};
    use crate::types::ResourceState;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Debug)]
    struct Node {
        name: &'static str,
        tier: usize,
        depends_on: Option<&'static str>,
        fail: bool,
        remote: bool,
        retired: bool,
        log: Log,
    }

    impl Node {
        fn new(name: &'static str, tier: usize, log: &Log) -> Self {
            Self {
                name,
                tier,
                depends_on: None,
                fail: false,
                remote: true,
                retired: false,
                log: Arc::clone(log),
            }
        }
    }

    impl Resource for Node {
        fn id(&self) -> String {
            format!("node.{}", self.name)
        }

        fn description(&self) -> String {
            format!("Node {}", self.name)
        }

        fn resource_type(&self) -> &'static str {
            "node"
        }

        fn tier(&self) -> usize {
            self.tier
        }

        fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
            if ctx.state.contains(&self.id()) && self.remote {
                Ok(ResourceState::Present { details: None })
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn desired_state(&self) -> ResourceState {
            if self.retired {
                ResourceState::Absent
            } else {
                ResourceState::Present { details: None }
            }
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if self.retired {
                return self.destroy(ctx);
            }
            if let Some(dependency) = self.depends_on {
                ctx.require_id(dependency)?;
            }
            if self.fail {
                anyhow::bail!("remote rejected {}", self.name);
            }
            self.log.lock().unwrap().push(format!("apply {}", self.id()));
            ctx.state.put(&self.id(), Tracked::new("node", self.name))?;
            Ok(ApplyResult::Created)
        }

        fn destroy(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            self.log.lock().unwrap().push(format!("destroy {}", self.id()));
            match ctx.state.remove(&self.id())? {
                Some(_) => Ok(ApplyResult::Removed),
                None => Ok(ApplyResult::NoChange),
            }
        }
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    struct Decline;

    impl ConfirmCallback for Decline {
        fn confirm(&mut self, _prompt: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn run(plan: ExecutionPlan, opts: ExecuteOptions, state: &dyn StateStore) -> Result<ExecuteSummary> {
        execute(plan, opts, state, &mut NoProgress, &mut AutoConfirm)
    }

    #[test]
    fn test_execute_empty_plan() {
        let state = MemoryState::new();
        let result = run(ExecutionPlan::new(), ExecuteOptions::default(), &state).unwrap();
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let log = log();
        let state = MemoryState::new();
        state.put("node.a", Tracked::new("node", "a")).unwrap();

        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("a", 0, &log)));

        let result = run(plan, ExecuteOptions::default(), &state).unwrap();
        // No diff means no execution
        assert_eq!(result.total(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_execute_with_changes() {
        let log = log();
        let state = MemoryState::new();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("a", 0, &log)));
        plan.add_resource(Box::new(Node::new("b", 0, &log)));

        let result = run(plan, ExecuteOptions::default(), &state).unwrap();
        assert_eq!(result.created, 2);
        assert_eq!(state.addresses(), vec!["node.a", "node.b"]);
    }

    #[test]
    fn test_lower_tiers_apply_first() {
        let log = log();
        let state = MemoryState::new();
        let mut child = Node::new("child", 1, &log);
        child.depends_on = Some("node.parent");

        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(child));
        plan.add_resource(Box::new(Node::new("parent", 0, &log)));

        let result = run(plan, ExecuteOptions::default(), &state).unwrap();
        assert!(result.is_success());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["apply node.parent", "apply node.child"]
        );
    }

    #[test]
    fn test_retired_resources_removed_children_first() {
        let log = log();
        let state = MemoryState::new();
        state.put("node.old_parent", Tracked::new("node", "old_parent")).unwrap();
        state.put("node.old_child", Tracked::new("node", "old_child")).unwrap();

        let mut old_parent = Node::new("old_parent", 0, &log);
        old_parent.retired = true;
        let mut old_child = Node::new("old_child", 1, &log);
        old_child.retired = true;

        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(old_parent));
        plan.add_resource(Box::new(old_child));
        plan.add_resource(Box::new(Node::new("new", 0, &log)));

        let opts = ExecuteOptions {
            jobs: 1,
            ..Default::default()
        };
        let result = run(plan, opts, &state).unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(result.removed, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "apply node.new",
                "destroy node.old_child",
                "destroy node.old_parent"
            ]
        );
        assert_eq!(state.addresses(), vec!["node.new"]);
    }

    #[test]
    fn test_failure_does_not_stop_siblings() {
        let log = log();
        let state = MemoryState::new();
        let mut broken = Node::new("broken", 0, &log);
        broken.fail = true;

        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(broken));
        plan.add_resource(Box::new(Node::new("fine", 0, &log)));

        let result = run(plan, ExecuteOptions::default(), &state).unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures[0].0, "node.broken");
        assert!(result.failures[0].1.contains("remote rejected broken"));
        assert!(state.contains("node.fine"));
    }

    #[test]
    fn test_declined_confirmation_skips() {
        let log = log();
        let state = MemoryState::new();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("a", 0, &log)));

        let result = execute(
            plan,
            ExecuteOptions::default(),
            &state,
            &mut NoProgress,
            &mut Decline,
        )
        .unwrap();
        assert_eq!(result.skipped, 1);
        assert!(state.addresses().is_empty());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let log = log();
        let state = MemoryState::new();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("a", 0, &log)));

        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = run(plan, opts, &state).unwrap();
        assert_eq!(result.total(), 0);
        assert!(state.addresses().is_empty());
    }

    #[test]
    fn test_destroy_runs_highest_tier_first() {
        let log = log();
        let state = MemoryState::new();
        state.put("node.parent", Tracked::new("node", "parent")).unwrap();
        state.put("node.child", Tracked::new("node", "child")).unwrap();

        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("parent", 0, &log)));
        plan.add_resource(Box::new(Node::new("child", 1, &log)));
        plan.add_resource(Box::new(Node::new("untracked", 1, &log)));

        let result = destroy(
            plan,
            ExecuteOptions::default(),
            &state,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(result.removed, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["destroy node.child", "destroy node.parent"]
        );
        assert!(state.addresses().is_empty());
    }

    #[test]
    fn test_refresh_drops_vanished_resources() {
        let log = log();
        let state = MemoryState::new();
        state.put("node.kept", Tracked::new("node", "kept")).unwrap();
        state.put("node.gone", Tracked::new("node", "gone")).unwrap();

        let mut gone = Node::new("gone", 0, &log);
        gone.remote = false;
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("kept", 0, &log)));
        plan.add_resource(Box::new(gone));

        let result = refresh(&plan, 2, &state).unwrap();
        assert_eq!(result.removed, 1);
        assert_eq!(result.no_change, 1);
        assert_eq!(state.addresses(), vec!["node.kept"]);
    }

    #[test]
    fn test_plan_diffs_in_tier_order() {
        let log = log();
        let state = MemoryState::new();
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Node::new("late", 2, &log)));
        plan.add_resource(Box::new(Node::new("early", 0, &log)));

        let diffs = plan_diffs(&plan, &state).unwrap();
        let ids: Vec<&str> = diffs.iter().map(|d| d.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["node.early", "node.late"]);
        assert!(diffs.iter().all(ResourceDiff::is_addition));
    }
}
