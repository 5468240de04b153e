//! Desired-state manifest (`runscope.toml`)
//!
//! ```toml
//! [api]
//! url = "https://api.runscope.com"
//!
//! [buckets.main]
//! name = "Payments"
//! team_uuid = "870ed937-bc6e-4d8b-a9a5-d7f9f2412fa3"
//!
//! [tests.checkout]
//! bucket = "main"
//! name = "Checkout flow"
//! description = "Places an order end to end"
//!
//! [environments.staging]
//! bucket = "main"
//! test = "checkout"          # omit for a bucket-wide shared environment
//! name = "Staging"
//! preserve_cookies = true
//! initial_variables = { base_url = "https://staging.example.com" }
//!
//! [[environments.staging.integrations]]
//! integration_type = "slack"
//! description = "#payments-alerts"
//! ```
//!
//! Owners are referenced either by manifest name (`bucket`, `test`) or by a
//! literal remote identifier (`bucket_key`, `test_id`) for entities managed
//! elsewhere.

use anyhow::{Context, Result, bail};
use declarative::StateStore;
use runscope::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The whole manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub buckets: BTreeMap<String, BucketSpec>,
    #[serde(default)]
    pub tests: BTreeMap<String, TestSpec>,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentSpec>,
}

/// `[api]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL; falls back to `RUNSCOPE_API_URL`, then the public endpoint
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketSpec {
    pub name: String,
    pub team_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    pub bucket: Option<String>,
    pub bucket_key: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSpec {
    pub bucket: Option<String>,
    pub bucket_key: Option<String>,
    pub test: Option<String>,
    pub test_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub preserve_cookies: bool,
    #[serde(default)]
    pub initial_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub integrations: Vec<IntegrationSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationSpec {
    /// Remote identifier; generated when omitted
    pub id: Option<String>,
    pub integration_type: String,
    #[serde(default)]
    pub description: String,
}

/// Reference from a manifest entry to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Another manifest entry, by address (`bucket.main`)
    Managed(String),
    /// A remote identifier managed elsewhere
    Literal(String),
}

impl Reference {
    /// Resolve to a remote identifier, if the owner is known yet
    pub fn lookup(&self, state: &dyn StateStore) -> Option<String> {
        match self {
            Self::Managed(address) => state.get(address).map(|tracked| tracked.id),
            Self::Literal(id) => Some(id.clone()),
        }
    }

    /// Resolve to a remote identifier, failing when a managed owner is untracked
    pub fn resolve(&self, state: &dyn StateStore) -> Result<String> {
        self.lookup(state).with_context(|| {
            format!("{self} has not been created yet; apply it first")
        })
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Managed(address) => f.write_str(address),
            Self::Literal(id) => write!(f, "\"{id}\""),
        }
    }
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let manifest =
            Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))?;
        log::debug!(
            "Loaded manifest {}: {} bucket(s), {} test(s), {} environment(s)",
            path.display(),
            manifest.buckets.len(),
            manifest.tests.len(),
            manifest.environments.len()
        );
        Ok(manifest)
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check names, required fields and references
    pub fn validate(&self) -> Result<()> {
        for (name, bucket) in &self.buckets {
            let owner = address(EntityKind::Bucket, name);
            check_name(&owner, name)?;
            require(&owner, "name", &bucket.name)?;
            require(&owner, "team_uuid", &bucket.team_uuid)?;
        }

        for (name, test) in &self.tests {
            let owner = address(EntityKind::Test, name);
            check_name(&owner, name)?;
            require(&owner, "name", &test.name)?;
            self.test_bucket(name, test)?;
        }

        for (name, env) in &self.environments {
            let owner = address(EntityKind::Environment, name);
            check_name(&owner, name)?;
            require(&owner, "name", &env.name)?;
            self.environment_owners(name, env)?;
            for integration in &env.integrations {
                require(&owner, "integration_type", &integration.integration_type)?;
            }
        }

        Ok(())
    }

    /// Owning bucket of a test
    pub fn test_bucket(&self, name: &str, test: &TestSpec) -> Result<Reference> {
        let owner = address(EntityKind::Test, name);
        reference(
            &owner,
            EntityKind::Bucket,
            test.bucket.as_deref(),
            test.bucket_key.as_deref(),
            &self.buckets,
        )?
        .with_context(|| format!("{owner}: `bucket` or `bucket_key` is required"))
    }

    /// Owning bucket and, for test-scoped environments, owning test
    ///
    /// The bucket may be omitted when the test is a manifest entry; it is
    /// then taken from the test.
    pub fn environment_owners(
        &self,
        name: &str,
        env: &EnvironmentSpec,
    ) -> Result<(Reference, Option<Reference>)> {
        let owner = address(EntityKind::Environment, name);
        let test = reference(
            &owner,
            EntityKind::Test,
            env.test.as_deref(),
            env.test_id.as_deref(),
            &self.tests,
        )?;
        let bucket = reference(
            &owner,
            EntityKind::Bucket,
            env.bucket.as_deref(),
            env.bucket_key.as_deref(),
            &self.buckets,
        )?;

        let test_bucket = match (&test, &env.test) {
            (Some(Reference::Managed(_)), Some(test_name)) => {
                let spec = &self.tests[test_name.as_str()];
                Some(self.test_bucket(test_name, spec)?)
            }
            _ => None,
        };

        let bucket = match (bucket, test_bucket) {
            (Some(bucket), Some(test_bucket)) if bucket != test_bucket => {
                bail!("{owner}: {bucket} does not own the referenced test (it belongs to {test_bucket})")
            }
            (Some(bucket), _) => bucket,
            (None, Some(test_bucket)) => test_bucket,
            (None, None) => bail!("{owner}: `bucket` or `bucket_key` is required"),
        };

        Ok((bucket, test))
    }

    /// Every declared address
    pub fn addresses(&self) -> Vec<String> {
        let buckets = self.buckets.keys().map(|n| address(EntityKind::Bucket, n));
        let tests = self.tests.keys().map(|n| address(EntityKind::Test, n));
        let envs = self
            .environments
            .keys()
            .map(|n| address(EntityKind::Environment, n));
        buckets.chain(tests).chain(envs).collect()
    }
}

/// Address of a manifest entry, e.g. `bucket.main`
pub fn address(kind: EntityKind, name: &str) -> String {
    format!("{kind}.{name}")
}

fn check_name(owner: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains('.') || name.contains(char::is_whitespace) {
        bail!("{owner}: names must be non-empty and contain no dots or spaces");
    }
    Ok(())
}

fn require(owner: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{owner}: `{field}` must not be empty");
    }
    Ok(())
}

fn reference<V>(
    owner: &str,
    kind: EntityKind,
    managed: Option<&str>,
    literal: Option<&str>,
    declared: &BTreeMap<String, V>,
) -> Result<Option<Reference>> {
    let literal_field = format!("{kind}_{}", kind.id_field());
    match (managed, literal) {
        (Some(_), Some(_)) => bail!("{owner}: set either `{kind}` or `{literal_field}`, not both"),
        (Some(name), None) => {
            if !declared.contains_key(name) {
                bail!("{owner}: {kind} \"{name}\" is not declared in the manifest");
            }
            Ok(Some(Reference::Managed(address(kind, name))))
        }
        (None, Some(id)) if id.trim().is_empty() => {
            bail!("{owner}: `{literal_field}` must not be empty")
        }
        (None, Some(id)) if id.trim() != id => {
            bail!("{owner}: `{literal_field}` must not have surrounding whitespace")
        }
        (None, Some(id)) => Ok(Some(Reference::Literal(id.to_string()))),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{MemoryState, Tracked};

    const MANIFEST: &str = r#"
        [api]
        url = "http://localhost:8080"

        [buckets.main]
        name = "Payments"
        team_uuid = "T1"

        [tests.checkout]
        bucket = "main"
        name = "Checkout"

        [environments.shared]
        bucket = "main"
        name = "Shared"

        [environments.staging]
        test = "checkout"
        name = "Staging"
        initial_variables = { base_url = "https://staging.test" }

        [[environments.staging.integrations]]
        integration_type = "slack"
    "#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.api.url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(manifest.buckets["main"].team_uuid, "T1");
        assert_eq!(manifest.tests["checkout"].description, "");
        let staging = &manifest.environments["staging"];
        assert_eq!(staging.integrations[0].id, None);
        assert!(!staging.preserve_cookies);
        assert_eq!(
            manifest.addresses(),
            vec![
                "bucket.main",
                "test.checkout",
                "environment.shared",
                "environment.staging"
            ]
        );
    }

    #[test]
    fn test_environment_inherits_bucket_from_test() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let (bucket, test) = manifest
            .environment_owners("staging", &manifest.environments["staging"])
            .unwrap();
        assert_eq!(bucket, Reference::Managed("bucket.main".into()));
        assert_eq!(test, Some(Reference::Managed("test.checkout".into())));

        let (_, test) = manifest
            .environment_owners("shared", &manifest.environments["shared"])
            .unwrap();
        assert_eq!(test, None);
    }

    #[test]
    fn test_literal_references() {
        let manifest = Manifest::parse(
            r#"
            [environments.external]
            bucket_key = "6t0sd3euxlwa"
            test_id = "t-42"
            name = "External"
        "#,
        )
        .unwrap();
        let (bucket, test) = manifest
            .environment_owners("external", &manifest.environments["external"])
            .unwrap();
        assert_eq!(bucket, Reference::Literal("6t0sd3euxlwa".into()));
        assert_eq!(test, Some(Reference::Literal("t-42".into())));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let err = Manifest::parse(
            r#"
            [tests.orphan]
            bucket = "missing"
            name = "Orphan"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("\"missing\" is not declared"));
    }

    #[test]
    fn test_both_reference_forms_rejected() {
        let err = Manifest::parse(
            r#"
            [buckets.main]
            name = "Main"
            team_uuid = "T1"

            [tests.smoke]
            bucket = "main"
            bucket_key = "abc"
            name = "Smoke"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_padded_literal_id_rejected() {
        let err = Manifest::parse(
            r#"
            [environments.external]
            bucket_key = "6t0sd3euxlwa"
            test_id = " t-42 "
            name = "External"
        "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("surrounding whitespace"));

        let err = Manifest::parse("[tests.smoke]\nbucket_key = \"  \"\nname = \"Smoke\"").unwrap_err();
        assert!(format!("{err:#}").contains("must not be empty"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(Manifest::parse("[buckets.main]\nname = \"\"\nteam_uuid = \"T1\"").is_err());
        assert!(Manifest::parse("[tests.smoke]\nname = \"Smoke\"").is_err());
        assert!(Manifest::parse("[buckets.\"a.b\"]\nname = \"x\"\nteam_uuid = \"T1\"").is_err());
        assert!(Manifest::parse("[buckets.main]\nname = \"x\"\nteam = \"T1\"").is_err());
    }

    #[test]
    fn test_mismatched_owners_rejected() {
        let err = Manifest::parse(
            r#"
            [buckets.one]
            name = "One"
            team_uuid = "T1"

            [buckets.two]
            name = "Two"
            team_uuid = "T1"

            [tests.smoke]
            bucket = "one"
            name = "Smoke"

            [environments.bad]
            bucket = "two"
            test = "smoke"
            name = "Bad"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not own"));
    }

    #[test]
    fn test_reference_resolution() {
        let state = MemoryState::new();
        let managed = Reference::Managed("bucket.main".into());
        assert!(managed.resolve(&state).is_err());

        state.put("bucket.main", Tracked::new("bucket", "b1")).unwrap();
        assert_eq!(managed.resolve(&state).unwrap(), "b1");
        assert_eq!(
            Reference::Literal("abc".into()).lookup(&state),
            Some("abc".to_string())
        );
    }
}
