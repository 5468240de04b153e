//! Execution engine - runscope-sync executor with UI integration

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{ConfirmCallback, ExecuteSummary, ExecutionPlan, StateStore};

use super::differ::display_diff;
use crate::progress::TierProgress;
use crate::ui;

/// Options for execution (includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs within a tier
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
        }
    }
}

impl ExecuteOptions {
    fn engine(&self) -> declarative::ExecuteOptions {
        declarative::ExecuteOptions {
            dry_run: self.dry_run,
            jobs: self.jobs,
        }
    }
}

/// Interactive confirmation, skipped by `--yes`
#[derive(Debug, Default)]
pub struct Prompt {
    yes: bool,
    declined: bool,
}

impl Prompt {
    pub fn new(yes: bool) -> Self {
        Self {
            yes,
            declined: false,
        }
    }

    /// Whether the user said no
    pub fn declined(&self) -> bool {
        self.declined
    }
}

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        self.declined = !confirmed;
        Ok(confirmed)
    }
}

/// Show the plan, confirm and apply it
pub fn apply(plan: ExecutionPlan, opts: &ExecuteOptions, state: &dyn StateStore) -> Result<ExecuteSummary> {
    let diffs = declarative::plan_diffs(&plan, state)?;
    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    println!();
    let mut progress = TierProgress::new("Applying");
    let mut prompt = Prompt::new(opts.yes);
    let summary = declarative::execute(plan, opts.engine(), state, &mut progress, &mut prompt)?;

    if prompt.declined() {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(summary);
    }

    print_summary(&summary, "Changes applied");
    ensure_success(&summary)?;
    Ok(summary)
}

/// List what would be destroyed, confirm and destroy it
pub fn destroy(plan: ExecutionPlan, opts: &ExecuteOptions, state: &dyn StateStore) -> Result<ExecuteSummary> {
    let tracked: Vec<(String, String)> = plan
        .resources()
        .filter_map(|r| state.get(&r.id()).map(|t| (r.id(), t.id)))
        .collect();

    if tracked.is_empty() {
        println!();
        println!("  {} Nothing to destroy", "✓".green());
        return Ok(ExecuteSummary::default());
    }

    ui::header("Resources to destroy");
    for (address, id) in &tracked {
        println!("  {} {:<30} {}", "-".red(), address, id.dimmed());
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    println!();
    let mut progress = TierProgress::new("Destroying");
    let mut prompt = Prompt::new(opts.yes);
    let summary = declarative::destroy(plan, opts.engine(), state, &mut progress, &mut prompt)?;

    if prompt.declined() {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(summary);
    }

    print_summary(&summary, "Resources destroyed");
    ensure_success(&summary)?;
    Ok(summary)
}

/// Drop state entries whose remote entity is gone
pub fn refresh(plan: &ExecutionPlan, jobs: usize, state: &dyn StateStore) -> Result<ExecuteSummary> {
    let summary = declarative::refresh(plan, jobs, state)?;

    if summary.removed == 0 && summary.is_success() {
        ui::success(&format!(
            "State is up to date ({} tracked)",
            ui::count(summary.no_change, "resource")
        ));
    } else {
        print_summary(&summary, "State refreshed");
    }
    ensure_success(&summary)?;
    Ok(summary)
}

/// Fail the command when any resource failed
fn ensure_success(summary: &ExecuteSummary) -> Result<()> {
    if !summary.is_success() {
        bail!("{} failed", ui::count(summary.failed, "resource"));
    }
    Ok(())
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, done: &str) {
    println!();
    if summary.is_success() {
        println!("  {} {done}", "✓".green().bold());
    } else {
        println!("  {} {done} with errors", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.modified, "updated"),
        (summary.replaced, "recreated"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
        (summary.no_change, "unchanged"),
    ];
    for (n, what) in lines {
        if n > 0 {
            println!("    • {} {what}", ui::count(n, "resource"));
        }
    }

    if summary.failed > 0 {
        println!("    • {} {}", ui::count(summary.failed, "resource"), "failed".red());
        for (id, error) in &summary.failures {
            println!("      {} {id}: {error}", "✗".red());
        }
    }
}
