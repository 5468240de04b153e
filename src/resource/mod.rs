//! Runscope entities as declarative resources
//!
//! Every manifest entry becomes a Resource with:
//! - An address (`bucket.main`) that keys it in the state file
//! - A tier, so owners are created before what they own
//! - State detection against the remote (current vs desired)
//! - Apply and destroy that keep the state file in step with the remote

mod bucket;
mod environment;
mod orphan;

pub use bucket::BucketResource;
pub use environment::EnvironmentResource;
pub use orphan::OrphanResource;
pub use test::TestResource;

use anyhow::{Context, Result, anyhow, bail};
use declarative::{ApplyContext, ApplyResult, Tracked};
use runscope::{Client, EntityKind, EnvironmentScope};
use std::sync::Arc;

/// Client shared by every resource of a run
pub type SharedClient = Arc<Client>;

/// Dependency tier of an entity kind
pub fn tier(kind: EntityKind) -> usize {
    match kind {
        EntityKind::Bucket => 0,
        EntityKind::Test => 1,
        EntityKind::Environment => 2,
    }
}

/// Entity kind recorded in a state entry
pub fn kind_of(tracked: &Tracked) -> Result<EntityKind> {
    EntityKind::all()
        .iter()
        .copied()
        .find(|kind| kind.name() == tracked.kind)
        .ok_or_else(|| anyhow!("unknown resource kind \"{}\" in state", tracked.kind))
}

/// Scope an environment was created in
pub fn scope_of(tracked: &Tracked) -> Result<EnvironmentScope> {
    let bucket = tracked
        .owner(EntityKind::Bucket.name())
        .with_context(|| format!("environment {} has no owning bucket in state", tracked.id))?;
    Ok(EnvironmentScope::resolve(
        bucket,
        tracked.owner(EntityKind::Test.name()),
    ))
}

/// Bucket a test or environment was created in
pub fn owning_bucket(tracked: &Tracked) -> Result<&str> {
    tracked
        .owner(EntityKind::Bucket.name())
        .with_context(|| format!("{} {} has no owning bucket in state", tracked.kind, tracked.id))
}

/// Turn a "not found" read into `None`
pub fn found<T>(result: runscope::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether a tracked entity still exists remotely
pub fn exists(client: &Client, tracked: &Tracked) -> Result<bool> {
    let kind = kind_of(tracked)?;
    let present = match kind {
        EntityKind::Bucket => found(client.read_bucket(&tracked.id))?.is_some(),
        EntityKind::Test => {
            found(client.read_test(owning_bucket(tracked)?, &tracked.id))?.is_some()
        }
        EntityKind::Environment => {
            found(client.read_environment(&scope_of(tracked)?, &tracked.id))?.is_some()
        }
    };
    Ok(present)
}

/// Delete a tracked entity through the scope it was created with
pub fn delete(client: &Client, tracked: &Tracked) -> Result<()> {
    match kind_of(tracked)? {
        EntityKind::Bucket => client.delete_bucket(&tracked.id)?,
        EntityKind::Test => client.delete_test(owning_bucket(tracked)?, &tracked.id)?,
        EntityKind::Environment => client.delete_environment(&scope_of(tracked)?, &tracked.id)?,
    }
    Ok(())
}

/// Delete the entity behind an address, confirm it is gone and forget it
///
/// Untracked addresses are left alone.
pub fn destroy_tracked(ctx: &ApplyContext, client: &Client, address: &str) -> Result<ApplyResult> {
    let Some(tracked) = ctx.state.get(address) else {
        return Ok(ApplyResult::NoChange);
    };

    if ctx.dry_run {
        return Ok(ApplyResult::Skipped {
            reason: "Dry run".to_string(),
        });
    }

    delete(client, &tracked).with_context(|| format!("Failed to delete {address}"))?;
    if exists(client, &tracked)? {
        bail!("{address} ({} {}) still exists after delete", tracked.kind, tracked.id);
    }

    ctx.state.remove(address)?;
    log::info!("Deleted {address} ({} {})", tracked.kind, tracked.id);
    Ok(ApplyResult::Removed)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use declarative::{MemoryState, StateStore};
    use runscope::{Bucket, ClientConfig, MockTransport};

    /// Client backed by an in-memory Runscope
    pub fn mock_client() -> (SharedClient, MockTransport) {
        let transport = MockTransport::new();
        let config = ClientConfig::new("http://runscope.test", "token").unwrap();
        let client = Client::with_transport(config, Box::new(transport.clone()));
        (Arc::new(client), transport)
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of(&Tracked::new("test", "t1")).unwrap(), EntityKind::Test);
        assert!(kind_of(&Tracked::new("schedule", "s1")).is_err());
    }

    #[test]
    fn test_scope_of() {
        let shared = Tracked::new("environment", "e1").with_owner("bucket", "b1");
        assert!(scope_of(&shared).unwrap().is_shared());

        let scoped = shared.clone().with_owner("test", "t1");
        assert_eq!(scope_of(&scoped).unwrap().test(), Some("t1"));

        assert!(scope_of(&Tracked::new("environment", "e1")).is_err());
    }

    #[test]
    fn test_destroy_tracked() {
        let (client, _) = mock_client();
        let key = client.create_bucket(&Bucket::new("t", "T1")).unwrap();
        let state = MemoryState::new();
        state.put("bucket.main", Tracked::new("bucket", &key)).unwrap();
        let ctx = ApplyContext::new(false, &state);

        let result = destroy_tracked(&ctx, &client, "bucket.main").unwrap();
        assert_eq!(result, ApplyResult::Removed);
        assert!(!state.contains("bucket.main"));
        assert!(!exists(&client, &Tracked::new("bucket", &key)).unwrap());

        let result = destroy_tracked(&ctx, &client, "bucket.main").unwrap();
        assert_eq!(result, ApplyResult::NoChange);
    }

    #[test]
    fn test_destroy_tracked_dry_run_keeps_everything() {
        let (client, _) = mock_client();
        let key = client.create_bucket(&Bucket::new("t", "T1")).unwrap();
        let state = MemoryState::new();
        state.put("bucket.main", Tracked::new("bucket", &key)).unwrap();
        let ctx = ApplyContext::new(true, &state);

        let result = destroy_tracked(&ctx, &client, "bucket.main").unwrap();
        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(state.contains("bucket.main"));
        assert!(client.read_bucket(&key).is_ok());
    }
}
