//! Orphan resource - tracked in state but no longer declared

use anyhow::Result;
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Tracked};

use super::{SharedClient, destroy_tracked, exists, kind_of, tier};

/// A state entry whose manifest declaration was removed
///
/// Its desired state is absence, so applying it deletes the remote entity.
/// Orphans keep their kind's tier; apply removes them after every declared
/// resource, owned entities before their owners.
#[derive(Debug)]
pub struct OrphanResource {
    address: String,
    tracked: Tracked,
    client: SharedClient,
}

impl OrphanResource {
    pub fn new(address: &str, tracked: Tracked, client: SharedClient) -> Self {
        Self {
            address: address.to_string(),
            tracked,
            client,
        }
    }
}

impl Resource for OrphanResource {
    fn id(&self) -> String {
        self.address.clone()
    }

    fn description(&self) -> String {
        format!("Undeclared {} {}", self.tracked.kind, self.tracked.id)
    }

    fn resource_type(&self) -> &'static str {
        kind_of(&self.tracked).map_or("unknown", |kind| kind.name())
    }

    fn tier(&self) -> usize {
        kind_of(&self.tracked).map_or(0, tier)
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let Some(tracked) = ctx.state.get(&self.address) else {
            return Ok(ResourceState::Absent);
        };

        // Still in state, so it has to go even if the remote already lost it.
        let details = if exists(&self.client, &tracked)? {
            tracked.id
        } else {
            format!("{} (already gone remotely)", tracked.id)
        };
        Ok(ResourceState::Present {
            details: Some(details),
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Absent
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        destroy_tracked(ctx, &self.client, &self.address)
    }

    fn destroy(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        destroy_tracked(ctx, &self.client, &self.address)
    }
}
