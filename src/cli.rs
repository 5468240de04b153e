use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "runscope-sync")]
#[command(version)]
#[command(about = "Keep Runscope buckets, tests and environments in line with a manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file [default: runscope.toml]
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// State file [default: runscope.state.toml next to the manifest]
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete remote entities to match the manifest
    Apply(ApplyArgs),

    /// Drop state entries whose remote entity no longer exists
    Refresh {
        /// Number of parallel reads
        #[arg(short, long, default_value = "4")]
        jobs: usize,
    },

    /// Delete every tracked entity
    Destroy(DestroyArgs),

    /// Inspect or edit the state file
    #[command(subcommand)]
    State(StateCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconcile Commands
// ============================================================================

#[derive(Parser)]
pub struct PlanArgs {
    /// Limit to a type or address (e.g. "tests", "bucket.main")
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print the planned changes as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Limit to a type or address (e.g. "tests", "bucket.main")
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs within a tier
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Parser)]
pub struct DestroyArgs {
    /// Limit to a type or address (e.g. "environments", "test.smoke")
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be deleted
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs within a tier
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

// ============================================================================
// State Commands
// ============================================================================

#[derive(Subcommand)]
pub enum StateCommand {
    /// List tracked addresses
    List,

    /// Show one tracked entry
    Show {
        /// Address, e.g. "environment.staging"
        address: String,
    },

    /// Forget an entry without deleting the remote entity
    Rm {
        /// Address, e.g. "environment.staging"
        address: String,
    },
}
