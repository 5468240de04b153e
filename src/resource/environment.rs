//! Environment resource - runtime configuration shared by a bucket or owned by a test

use anyhow::{Context, Result};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, Tracked};
use runscope::{EntityKind, Environment, EnvironmentScope, Integration};

use super::{SharedClient, destroy_tracked, found, scope_of, tier};
use crate::config::{EnvironmentSpec, IntegrationSpec, Reference, address};

/// A declared environment
///
/// Everything but the scope changes in place. An environment that moves to
/// another bucket or test is recreated there.
#[derive(Debug)]
pub struct EnvironmentResource {
    name: String,
    spec: EnvironmentSpec,
    bucket: Reference,
    test: Option<Reference>,
    client: SharedClient,
}

impl EnvironmentResource {
    pub fn new(
        name: &str,
        spec: EnvironmentSpec,
        bucket: Reference,
        test: Option<Reference>,
        client: SharedClient,
    ) -> Self {
        Self {
            name: name.to_string(),
            spec,
            bucket,
            test,
            client,
        }
    }

    /// Scope from the declared owners, once all of them are tracked
    fn desired_scope(&self, ctx: &ApplyContext) -> Result<EnvironmentScope, String> {
        let bucket = self
            .bucket
            .lookup(ctx.state)
            .ok_or_else(|| format!("{} will be created", self.bucket))?;
        let test = match &self.test {
            Some(test) => Some(
                test.lookup(ctx.state)
                    .ok_or_else(|| format!("{test} will be created"))?,
            ),
            None => None,
        };
        Ok(EnvironmentScope::resolve(bucket, test.as_deref()))
    }

    /// The record to send, reusing identifiers of matching remote integrations
    fn desired(&self, scope: &EnvironmentScope, remote: &[Integration]) -> Environment {
        let mut environment = Environment::new(&self.spec.name);
        environment.test_id = scope.test().map(str::to_string);
        environment.script = self.spec.script.clone();
        environment.preserve_cookies = self.spec.preserve_cookies;
        environment.initial_variables = self.spec.initial_variables.clone();
        environment.integrations = integrations(&self.spec.integrations, remote);
        environment
    }

    /// Current state together with the remote record it was derived from
    fn inspect(&self, ctx: &ApplyContext) -> Result<(ResourceState, Option<Environment>)> {
        let Some(tracked) = ctx.state.get(&self.id()) else {
            return Ok((ResourceState::Absent, None));
        };
        let created_in = scope_of(&tracked)?;

        let Some(remote) = found(self.client.read_environment(&created_in, &tracked.id))? else {
            log::debug!("{} ({}) no longer exists remotely", self.id(), tracked.id);
            return Ok((ResourceState::Absent, None));
        };

        let scope = match self.desired_scope(ctx) {
            Ok(scope) if scope == created_in => scope,
            Ok(scope) => {
                let reason = format!("{created_in} -> {scope}");
                return Ok((ResourceState::Replace { reason }, Some(remote)));
            }
            Err(reason) => return Ok((ResourceState::Replace { reason }, Some(remote))),
        };

        let desired = self.desired(&scope, &remote.integrations);
        let (from, to) = changes(&remote, &desired);
        if from.is_empty() {
            return Ok((ResourceState::Present { details: None }, Some(remote)));
        }

        let state = ResourceState::Modified {
            from: from.join(", "),
            to: to.join(", "),
        };
        Ok((state, Some(remote)))
    }

    fn create(&self, ctx: &ApplyContext) -> Result<()> {
        let bucket = self.bucket.resolve(ctx.state)?;
        let test = match &self.test {
            Some(test) => Some(test.resolve(ctx.state)?),
            None => None,
        };
        let scope = EnvironmentScope::resolve(&bucket, test.as_deref());

        let id = self
            .client
            .create_environment(&scope, &self.desired(&scope, &[]))
            .with_context(|| format!("Failed to create {}", self.id()))?;

        let mut tracked = Tracked::new(EntityKind::Environment.name(), &id)
            .with_owner(EntityKind::Bucket.name(), scope.bucket());
        if let Some(test) = scope.test() {
            tracked = tracked.with_owner(EntityKind::Test.name(), test);
        }
        ctx.state.put(&self.id(), tracked)?;
        log::info!("Created {} as {id} ({scope})", self.id());
        Ok(())
    }

    fn update(&self, ctx: &ApplyContext, remote: &Environment) -> Result<()> {
        let tracked = ctx
            .state
            .get(&self.id())
            .with_context(|| format!("{} is not tracked", self.id()))?;
        let scope = scope_of(&tracked)?;

        let mut environment = self.desired(&scope, &remote.integrations);
        environment.id = tracked.id;
        self.client
            .update_environment(&scope, &environment)
            .with_context(|| format!("Failed to update {}", self.id()))?;
        log::info!("Updated {} ({scope})", self.id());
        Ok(())
    }
}

impl Resource for EnvironmentResource {
    fn id(&self) -> String {
        address(EntityKind::Environment, &self.name)
    }

    fn description(&self) -> String {
        match &self.test {
            Some(test) => format!("Environment \"{}\" for {test}", self.spec.name),
            None => format!("Environment \"{}\" shared in {}", self.spec.name, self.bucket),
        }
    }

    fn resource_type(&self) -> &'static str {
        EntityKind::Environment.name()
    }

    fn tier(&self) -> usize {
        tier(EntityKind::Environment)
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        Ok(self.inspect(ctx)?.0)
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

        match self.inspect(ctx)? {
            (ResourceState::Absent, _) => {
                self.create(ctx)?;
                Ok(ApplyResult::Created)
            }
            (ResourceState::Modified { .. }, Some(remote)) => {
                self.update(ctx, &remote)?;
                Ok(ApplyResult::Modified)
            }
            (ResourceState::Replace { reason }, _) => {
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

/// Resolve declared integrations against the remote ones
///
/// An integration without an explicit id takes the id of the first unused
/// remote integration with the same type and description, or a fresh one.
fn integrations(declared: &[IntegrationSpec], remote: &[Integration]) -> Vec<Integration> {
    let mut used = vec![false; remote.len()];
    declared
        .iter()
        .map(|spec| {
            let id = spec.id.clone().or_else(|| {
                let index = remote.iter().enumerate().position(|(i, r)| {
                    !used[i]
                        && r.integration_type == spec.integration_type
                        && r.description == spec.description
                })?;
                used[index] = true;
                Some(remote[index].id.clone())
            });

            let mut integration = Integration::new(&spec.integration_type);
            if let Some(id) = id {
                integration.id = id;
            }
            integration.description = spec.description.clone();
            integration
        })
        .collect()
}

/// Differing fields as `(from, to)` descriptions
fn changes(remote: &Environment, desired: &Environment) -> (Vec<String>, Vec<String>) {
    let mut from = Vec::new();
    let mut to = Vec::new();

    if remote.name != desired.name {
        from.push(format!("name {:?}", remote.name));
        to.push(format!("name {:?}", desired.name));
    }
    if remote.script != desired.script {
        from.push(format!("script ({} bytes)", remote.script.len()));
        to.push(format!("script ({} bytes)", desired.script.len()));
    }
    if remote.preserve_cookies != desired.preserve_cookies {
        from.push(format!("preserve_cookies {}", remote.preserve_cookies));
        to.push(format!("preserve_cookies {}", desired.preserve_cookies));
    }
    if remote.initial_variables != desired.initial_variables {
        from.push(format!("{} variable(s)", remote.initial_variables.len()));
        to.push(format!("{} variable(s)", desired.initial_variables.len()));
    }
    if remote.integrations != desired.integrations {
        from.push(format!("{} integration(s)", remote.integrations.len()));
        to.push(format!("{} integration(s)", desired.integrations.len()));
    }

    (from, to)
}
