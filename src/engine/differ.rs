//! Diff display - what `plan` and `apply` show before changing anything

use colored::{ColoredString, Colorize};
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};

use crate::ui;

/// Heading for a resource type
fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "bucket" => "Buckets",
        "test" => "Tests",
        "environment" => "Environments",
        other => other,
    }
}

fn symbol(diff: &ResourceDiff) -> ColoredString {
    if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else if diff.is_replacement() {
        "±".magenta()
    } else if diff.is_modification() {
        "~".yellow()
    } else {
        "?".dimmed()
    }
}

/// Short description of the change
pub fn describe(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, _) => "(will create)".to_string(),
        (ResourceState::Present { details }, ResourceState::Absent) => match details {
            Some(details) => format!("(will delete {details})"),
            None => "(will delete)".to_string(),
        },
        (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
        (ResourceState::Replace { reason }, _) => format!("(must be recreated: {reason})"),
        _ => String::new(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Planned Changes".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        println!("│ {}", type_heading(&resource_type).bold());
        for diff in type_diffs {
            println!(
                "│   {} {:<30} {}",
                symbol(diff),
                diff.resource_id,
                describe(diff).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} ({} to create, {} to update, {} to recreate, {} to delete)",
        ui::count(diffs.len(), "change").bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
