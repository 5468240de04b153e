//! Command implementations
//!
//! Every reconcile command starts the same way: resolve paths, load the
//! manifest and state file, build the client and plan.

pub mod reconcile;
pub mod state;

use anyhow::{Context as AnyhowContext, Result};
use declarative::ExecutionPlan;
use runscope::{Client, ClientConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::config::Manifest;
use crate::engine::build_plan;
use crate::paths;
use crate::state::StateFile;

/// Manifest, state and client for one run
pub struct Session {
    pub manifest: Manifest,
    pub state: StateFile,
    pub client: Arc<Client>,
}

impl Session {
    /// Load everything a reconcile command needs
    pub fn open(ctx: &Context) -> Result<Self> {
        let manifest_path = paths::manifest_path(ctx.manifest.as_deref());
        let manifest = Manifest::load(&manifest_path)?;
        let state = open_state(ctx)?;

        let config = ClientConfig::from_env(manifest.api.url.as_deref())
            .context("Could not configure the Runscope client")?;
        log::debug!("Using Runscope API at {}", config.api_url());

        Ok(Self {
            manifest,
            state,
            client: Arc::new(Client::new(config)),
        })
    }

    /// Plan for the whole manifest, optionally narrowed to a target
    pub fn plan(&self, target: Option<&str>) -> Result<ExecutionPlan> {
        let plan = build_plan(&self.manifest, &self.state, &self.client)?;
        Ok(plan.filter_by_target(target))
    }
}

/// State file path for this invocation
pub fn state_path(ctx: &Context) -> PathBuf {
    let manifest = paths::manifest_path(ctx.manifest.as_deref());
    paths::state_path(ctx.state.as_deref(), &manifest)
}

/// Load the state file alone, for commands that never talk to the API
pub fn open_state(ctx: &Context) -> Result<StateFile> {
    StateFile::load(&state_path(ctx))
}
