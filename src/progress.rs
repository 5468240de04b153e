//! Progress indicators for runscope-sync.
//!
//! An indicatif bar that the declarative executor drives through
//! [`ProgressCallback`].

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for `len` items
pub fn bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message(msg.to_string());
    pb
}

/// Symbol shown next to a finished resource
pub fn symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created
        | ApplyResult::Modified
        | ApplyResult::Replaced
        | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// One bar per tier, with a line printed for each finished resource
pub struct TierProgress {
    verb: &'static str,
    bar: Option<ProgressBar>,
}

impl TierProgress {
    /// `verb` is shown while a tier runs, e.g. "Applying"
    pub fn new(verb: &'static str) -> Self {
        Self { verb, bar: None }
    }

    fn line(result: &ApplyResult, id: &str) -> String {
        let symbol = symbol(result);
        match result {
            ApplyResult::Failed { error } => format!("  {} {id}: {error}", symbol.red()),
            ApplyResult::Skipped { reason } => {
                format!("  {} {id} {}", symbol.dimmed(), format!("({reason})").dimmed())
            }
            ApplyResult::NoChange => format!("  {} {id}", symbol.dimmed()),
            ApplyResult::Created => format!("  {} {id} {}", symbol.green(), "created".dimmed()),
            ApplyResult::Modified => format!("  {} {id} {}", symbol.green(), "updated".dimmed()),
            ApplyResult::Replaced => format!("  {} {id} {}", symbol.green(), "replaced".dimmed()),
            ApplyResult::Removed => format!("  {} {id} {}", symbol.green(), "deleted".dimmed()),
        }
    }
}

impl ProgressCallback for TierProgress {
    fn on_tier_start(&mut self, tier: usize, count: usize) {
        self.bar = Some(bar(count as u64, &format!("{} tier {tier}", self.verb)));
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let line = Self::line(result, id);
        match &self.bar {
            Some(pb) => {
                pb.println(line);
                pb.inc(1);
            }
            None => println!("{line}"),
        }
    }

    fn on_tier_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
