//! Reconcile commands
//!
//! - `plan` - Preview what apply would change
//! - `apply` - Make the remote match the manifest
//! - `refresh` - Forget entities that vanished remotely
//! - `destroy` - Delete everything the state file tracks

use anyhow::{Context as AnyhowContext, Result};

use super::Session;
use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, PlanArgs};
use crate::engine::{self, ExecuteOptions};
use crate::ui;

/// Show the changes apply would make
pub fn plan(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = session.plan(args.target.as_deref())?;

    if plan.is_empty() {
        ui::warn("Nothing matches; check the manifest or --target");
        return Ok(());
    }

    let diffs = declarative::plan_diffs(&plan, &session.state)?;
    if args.json {
        let json = serde_json::to_string_pretty(&diffs).context("Failed to serialize plan")?;
        println!("{json}");
        return Ok(());
    }

    engine::display_diff(&diffs);
    if !diffs.is_empty() && !ctx.quiet {
        println!();
        ui::dim("Run 'runscope-sync apply' to make these changes");
    }
    Ok(())
}

/// Converge the remote on the manifest
pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = session.plan(args.target.as_deref())?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        yes: args.yes,
    };
    engine::executor::apply(plan, &opts, &session.state)?;
    Ok(())
}

/// Drop state entries whose remote entity is gone
pub fn refresh(ctx: &Context, jobs: usize) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = session.plan(None)?;
    engine::executor::refresh(&plan, jobs, &session.state)?;
    Ok(())
}

/// Delete tracked entities, owned ones first
pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let plan = session.plan(args.target.as_deref())?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        yes: args.yes,
    };
    engine::executor::destroy(plan, &opts, &session.state)?;
    Ok(())
}
