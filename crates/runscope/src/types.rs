//! Entity records exchanged with the Runscope API.
//!
//! Each record is decoded once from the envelope's `data` member. Required
//! fields are plain values, so a response missing one fails to decode instead
//! of silently producing an empty string.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kinds of entity managed through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Top-level container owned by a team.
    Bucket,
    /// Check definition owned by a bucket.
    Test,
    /// Runtime configuration shared by a bucket or owned by a test.
    Environment,
}

impl EntityKind {
    /// Get the kind name as used in messages and manifest addresses.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Test => "test",
            Self::Environment => "environment",
        }
    }

    /// Name of the identifier field in a create response's `data` map.
    #[must_use]
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Bucket => "key",
            Self::Test | Self::Environment => "id",
        }
    }

    /// Read statuses that mean the entity does not exist.
    ///
    /// The bucket endpoint answers 403 for unknown keys, so 403 is treated as
    /// absence for buckets. This also hides a genuine loss of permission on a
    /// bucket: the entity is dropped from tracked state instead of surfacing
    /// an authorization error.
    #[must_use]
    pub fn absent_statuses(&self) -> &'static [u16] {
        match self {
            Self::Bucket => &[403, 404],
            Self::Test | Self::Environment => &[404],
        }
    }

    /// Delete statuses that mean the entity was already gone.
    #[must_use]
    pub fn is_gone(&self, status: u16) -> bool {
        matches!(status, 404 | 410)
    }

    /// Whether the kind supports in-place updates.
    #[must_use]
    pub fn supports_update(&self) -> bool {
        !matches!(self, Self::Bucket)
    }

    /// All kinds in dependency order.
    #[must_use]
    pub fn all() -> &'static [EntityKind] {
        &[Self::Bucket, Self::Test, Self::Environment]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Team that owns a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Team {
    /// Team UUID.
    pub id: String,
    /// Display name, present on responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Team {
    /// Reference a team by identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// A bucket.
///
/// `key` is assigned by the API on creation; `name` and `team` cannot be
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Remote-assigned key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Owning team.
    pub team: Team,
}

impl Bucket {
    /// A bucket that has not been created yet.
    pub fn new(name: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            key: String::new(),
            name: name.into(),
            team: Team::new(team_id),
        }
    }

    /// Form fields accepted by the bucket creation endpoint.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("name".to_string(), self.name.clone()),
            ("team_uuid".to_string(), self.team.id.clone()),
        ]
    }
}

/// A test within a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    /// Remote-assigned identifier; omitted from request bodies until known.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Key of the owning bucket. Part of the path, never of the body.
    #[serde(skip)]
    pub bucket_key: String,
    /// Test name.
    pub name: String,
    /// Free-form description, the only field updated in place.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

impl Test {
    /// A test that has not been created yet.
    pub fn new(bucket_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            bucket_key: bucket_key.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Notification or tooling integration attached to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    /// Integration identifier.
    pub id: String,
    /// Integration type, e.g. `slack` or `pagerduty`.
    pub integration_type: String,
    /// Human-readable description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

impl Integration {
    /// An integration with a freshly generated identifier.
    pub fn new(integration_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            integration_type: integration_type.into(),
            description: String::new(),
        }
    }
}

/// An environment, either shared by a bucket or owned by one of its tests.
///
/// Which of the two applies is not stored here; it is carried by
/// [`EnvironmentScope`](crate::EnvironmentScope).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Remote-assigned identifier; omitted from request bodies until known.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Environment name.
    pub name: String,
    /// Owning test, for test-scoped environments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// Initialization script.
    #[serde(default, deserialize_with = "nullable")]
    pub script: String,
    /// Whether cookies persist between requests.
    #[serde(default, deserialize_with = "nullable")]
    pub preserve_cookies: bool,
    /// Initial variables; ordering carries no meaning.
    #[serde(default, deserialize_with = "nullable")]
    pub initial_variables: BTreeMap<String, String>,
    /// Integrations, in declaration order.
    #[serde(default, deserialize_with = "nullable")]
    pub integrations: Vec<Integration>,
}

impl Environment {
    /// An environment that has not been created yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
