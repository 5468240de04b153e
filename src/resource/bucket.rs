//! Bucket resource - top-level container owned by a team

use anyhow::{Context, Result};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Tracked};
use runscope::{Bucket, EntityKind};

use super::{SharedClient, destroy_tracked, found, tier};
use crate::config::{BucketSpec, address};

/// A declared bucket
///
/// Name and team are fixed at creation, so any difference means the bucket
/// is deleted and created again under a new key.
#[derive(Debug)]
pub struct BucketResource {
    name: String,
    spec: BucketSpec,
    client: SharedClient,
}

impl BucketResource {
    pub fn new(name: &str, spec: BucketSpec, client: SharedClient) -> Self {
        Self {
            name: name.to_string(),
            spec,
            client,
        }
    }

    fn desired(&self) -> Bucket {
        Bucket::new(&self.spec.name, &self.spec.team_uuid)
    }

    fn create(&self, ctx: &ApplyContext) -> Result<String> {
        let key = self
            .client
            .create_bucket(&self.desired())
            .with_context(|| format!("Failed to create {}", self.id()))?;
        ctx.state
            .put(&self.id(), Tracked::new(EntityKind::Bucket.name(), &key))?;
        log::info!("Created {} with key {key}", self.id());
        Ok(key)
    }
}

impl Resource for BucketResource {
    fn id(&self) -> String {
        address(EntityKind::Bucket, &self.name)
    }

    fn description(&self) -> String {
        format!("Bucket \"{}\" (team {})", self.spec.name, self.spec.team_uuid)
    }

    fn resource_type(&self) -> &'static str {
        EntityKind::Bucket.name()
    }

    fn tier(&self) -> usize {
        tier(EntityKind::Bucket)
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let Some(tracked) = ctx.state.get(&self.id()) else {
            return Ok(ResourceState::Absent);
        };

        let Some(remote) = found(self.client.read_bucket(&tracked.id))? else {
            log::debug!("{} ({}) no longer exists remotely", self.id(), tracked.id);
            return Ok(ResourceState::Absent);
        };

        if remote.name != self.spec.name {
            return Ok(ResourceState::Replace {
                reason: format!("name \"{}\" -> \"{}\"", remote.name, self.spec.name),
            });
        }
        if remote.team.id != self.spec.team_uuid {
            return Ok(ResourceState::Replace {
                reason: format!("team {} -> {}", remote.team.id, self.spec.team_uuid),
            });
        }

        Ok(ResourceState::Present { details: None })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        match self.current_state(ctx)? {
            ResourceState::Absent => {
                self.create(ctx)?;
                Ok(ApplyResult::Created)
            }
            ResourceState::Replace { reason } => {
                log::info!("Replacing {}: {reason}", self.id());
                destroy_tracked(ctx, &self.client, &self.id())?;
                self.create(ctx)?;
                Ok(ApplyResult::Replaced)
            }
            _ => Ok(ApplyResult::NoChange),
        }
    }

    fn destroy(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        destroy_tracked(ctx, &self.client, &self.id())
    }
}
