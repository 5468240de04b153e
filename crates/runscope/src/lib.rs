//! # runscope
//!
//! Blocking client library for the Runscope API.
//!
//! This crate provides:
//! - Create, read, update, delete and list operations for buckets, tests and
//!   environments
//! - Environment scope resolution (bucket-shared vs. test-owned)
//! - Error classification that separates "entity is gone" from hard failures
//! - A [`MockTransport`] that behaves like the API, for tests
//!
//! ## Example
//!
//! ```no_run
//! use runscope::{Bucket, Client, ClientConfig, EnvironmentScope, Environment, Test};
//!
//! let config = ClientConfig::from_env(None).expect("RUNSCOPE_ACCESS_TOKEN not set");
//! let client = Client::new(config);
//!
//! let bucket = client.create_bucket(&Bucket::new("payments", "team-uuid")).unwrap();
//! let test = client.create_test(&Test::new(&bucket, "checkout")).unwrap();
//!
//! // Environments live either under the bucket or under a single test.
//! let scope = EnvironmentScope::resolve(&bucket, Some(&test));
//! client.create_environment(&scope, &Environment::new("staging")).unwrap();
//! ```
//!
//! ## Absence
//!
//! Reads classify "the entity does not exist" as
//! [`ErrorCategory::NotFound`] so callers can drop it from tracked state:
//!
//! | Kind        | Absent statuses |
//! |-------------|-----------------|
//! | Bucket      | 403, 404        |
//! | Test        | 404             |
//! | Environment | 404             |
//!
//! Deletes treat 404 and 410 as success.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod scope;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_API_URL, ENV_ACCESS_TOKEN, ENV_API_URL};
pub use error::{Error, ErrorCategory, Operation, Result};
pub use scope::EnvironmentScope;
pub use transport::MockTransport;
pub use types::{Bucket, EntityKind, Environment, Integration, Team, Test};
