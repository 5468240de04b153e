//! State file commands: list, show, rm

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::StateStore;

use super::open_state;
use crate::Context;
use crate::cli::StateCommand;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, cmd: StateCommand) -> Result<()> {
    let state = open_state(ctx)?;
    match cmd {
        StateCommand::List => list(&state),
        StateCommand::Show { address } => show(&state, &address),
        StateCommand::Rm { address } => rm(&state, &address),
    }
}

fn list(state: &StateFile) -> Result<()> {
    let addresses = state.addresses();
    if addresses.is_empty() {
        ui::info(&format!("No resources tracked in {}", state.path().display()));
        return Ok(());
    }

    ui::header(&format!("Tracked resources ({})", addresses.len()));
    for address in addresses {
        if let Some(tracked) = state.get(&address) {
            println!("  {:<32} {}", address, tracked.id.dimmed());
        }
    }
    Ok(())
}

fn show(state: &StateFile, address: &str) -> Result<()> {
    let Some(tracked) = state.get(address) else {
        bail!("{address} is not tracked in {}", state.path().display());
    };

    ui::header(address);
    ui::kv("Kind", &tracked.kind);
    ui::kv("Id", &tracked.id);
    for (owner, id) in &tracked.scope {
        ui::kv(&format!("Owner ({owner})"), id);
    }
    ui::kv(
        "Last updated",
        &state.snapshot().last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    Ok(())
}

fn rm(state: &StateFile, address: &str) -> Result<()> {
    match state.remove(address)? {
        Some(tracked) => {
            ui::success(&format!(
                "Forgot {address} ({} {}); the remote entity was left alone",
                tracked.kind, tracked.id
            ));
            Ok(())
        }
        None => bail!("{address} is not tracked in {}", state.path().display()),
    }
}
