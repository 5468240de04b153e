//! Environment scope resolution.
//!
//! An environment lives either under a bucket (shared by all of its tests)
//! or under a single test. The scope is derived from the identifiers alone and
//! selects the path family used for every operation on the environment.

use std::fmt;

/// Where an environment lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvironmentScope {
    /// Shared by every test in the bucket: `/buckets/{bucket}/environments`.
    Shared {
        /// Owning bucket key.
        bucket: String,
    },
    /// Owned by one test: `/buckets/{bucket}/tests/{test}/environments`.
    Test {
        /// Owning bucket key.
        bucket: String,
        /// Owning test identifier.
        test: String,
    },
}

impl EnvironmentScope {
    /// Derive the scope from a bucket key and an optional test identifier.
    ///
    /// A present, non-empty test identifier selects the test scope; anything
    /// else selects the shared scope.
    pub fn resolve(bucket: impl Into<String>, test: Option<&str>) -> Self {
        let bucket = bucket.into();
        match test.filter(|t| !t.is_empty()) {
            Some(test) => Self::Test {
                bucket,
                test: test.to_string(),
            },
            None => Self::Shared { bucket },
        }
    }

    /// The owning bucket key.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Shared { bucket } | Self::Test { bucket, .. } => bucket,
        }
    }

    /// The owning test identifier, for test-scoped environments.
    #[must_use]
    pub fn test(&self) -> Option<&str> {
        match self {
            Self::Shared { .. } => None,
            Self::Test { test, .. } => Some(test),
        }
    }

    /// Whether this is a bucket-wide shared environment.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared { .. })
    }

    /// Collection path for environments in this scope.
    #[must_use]
    pub fn collection_path(&self) -> String {
        match self {
            Self::Shared { bucket } => format!("/buckets/{bucket}/environments"),
            Self::Test { bucket, test } => {
                format!("/buckets/{bucket}/tests/{test}/environments")
            }
        }
    }

    /// Item path for one environment in this scope.
    #[must_use]
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.collection_path())
    }
}

impl fmt::Display for EnvironmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared { bucket } => write!(f, "shared in bucket {bucket}"),
            Self::Test { bucket, test } => write!(f, "test {test} in bucket {bucket}"),
        }
    }
}
