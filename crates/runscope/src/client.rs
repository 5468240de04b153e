//! High-level client for the Runscope API.

use crate::config::ClientConfig;
use crate::envelope;
use crate::error::{Error, Operation, Result};
use crate::scope::EnvironmentScope;
use crate::transport::http::HttpTransport;
use crate::transport::{Body, Method, Request, Response, Transport};
use crate::types::{Bucket, EntityKind, Environment, Test};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Client for bucket, test and environment operations.
///
/// Every operation is one blocking request. The client holds no mutable
/// state, so it can be shared across threads.
///
/// # Example
///
/// ```
/// use runscope::{Bucket, Client, ClientConfig, MockTransport};
///
/// let config = ClientConfig::new("https://api.runscope.test", "token").unwrap();
/// let client = Client::with_transport(config, Box::new(MockTransport::new()));
///
/// let key = client.create_bucket(&Bucket::new("payments", "T1")).unwrap();
/// let bucket = client.read_bucket(&key).unwrap();
/// assert_eq!(bucket.name, "payments");
/// ```
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client that talks HTTP to the configured base URL.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Box::new(HttpTransport::new()))
    }

    /// Create a client with a custom transport (useful for testing).
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Buckets
    // =========================================================================

    /// Create a bucket and return its remote-assigned key.
    ///
    /// The bucket endpoint only accepts form-encoded input.
    pub fn create_bucket(&self, bucket: &Bucket) -> Result<String> {
        let body = Body::Form(bucket.form_fields());
        self.create_resource(EntityKind::Bucket, &bucket.name, "/buckets", body)
    }

    /// Read a bucket by key.
    ///
    /// An unknown key is reported as 403 by the API, which classifies as not
    /// found here.
    pub fn read_bucket(&self, key: &str) -> Result<Bucket> {
        self.read_resource(EntityKind::Bucket, key, &format!("/buckets/{key}"))
    }

    /// Buckets cannot be modified after creation.
    pub fn update_bucket(&self, bucket: &Bucket) -> Result<Bucket> {
        let key = &bucket.key;
        self.update_resource(EntityKind::Bucket, key, &format!("/buckets/{key}"), bucket)
    }

    /// Delete a bucket. A bucket that is already gone counts as deleted.
    pub fn delete_bucket(&self, key: &str) -> Result<()> {
        self.delete_resource(EntityKind::Bucket, key, &format!("/buckets/{key}"))
    }

    /// List every bucket visible to the token.
    pub fn list_buckets(&self) -> Result<Vec<Bucket>> {
        self.list_resource(EntityKind::Bucket, "all", "/buckets")
    }

    // =========================================================================
    // Tests
    // =========================================================================

    /// Create a test in `test.bucket_key` and return its identifier.
    pub fn create_test(&self, test: &Test) -> Result<String> {
        let body = self.json_body(Operation::Create, EntityKind::Test, &test.name, test)?;
        let path = format!("/buckets/{}/tests", test.bucket_key);
        self.create_resource(EntityKind::Test, &test.name, &path, body)
    }

    /// Read a test.
    pub fn read_test(&self, bucket_key: &str, id: &str) -> Result<Test> {
        let path = format!("/buckets/{bucket_key}/tests/{id}");
        let mut test: Test = self.read_resource(EntityKind::Test, id, &path)?;
        test.bucket_key = bucket_key.to_string();
        Ok(test)
    }

    /// Update a test in place and return the stored record.
    pub fn update_test(&self, test: &Test) -> Result<Test> {
        let path = format!("/buckets/{}/tests/{}", test.bucket_key, test.id);
        let mut updated: Test = self.update_resource(EntityKind::Test, &test.id, &path, test)?;
        updated.bucket_key = test.bucket_key.clone();
        Ok(updated)
    }

    /// Delete a test. A test that is already gone counts as deleted.
    pub fn delete_test(&self, bucket_key: &str, id: &str) -> Result<()> {
        let path = format!("/buckets/{bucket_key}/tests/{id}");
        self.delete_resource(EntityKind::Test, id, &path)
    }

    /// List the tests in a bucket.
    pub fn list_tests(&self, bucket_key: &str) -> Result<Vec<Test>> {
        let path = format!("/buckets/{bucket_key}/tests");
        let mut tests: Vec<Test> = self.list_resource(EntityKind::Test, bucket_key, &path)?;
        for test in &mut tests {
            test.bucket_key = bucket_key.to_string();
        }
        Ok(tests)
    }

    // =========================================================================
    // Environments
    // =========================================================================

    /// Create an environment in `scope` and return its identifier.
    pub fn create_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<String> {
        let name = &environment.name;
        let body = self.json_body(Operation::Create, EntityKind::Environment, name, environment)?;
        let path = scope.collection_path();
        self.create_resource(EntityKind::Environment, name, &path, body)
    }

    /// Read an environment through the path family of its scope.
    pub fn read_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<Environment> {
        self.read_resource(EntityKind::Environment, id, &scope.item_path(id))
    }

    /// Update an environment in place and return the stored record.
    pub fn update_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        let id = &environment.id;
        self.update_resource(EntityKind::Environment, id, &scope.item_path(id), environment)
    }

    /// Delete an environment. One that is already gone counts as deleted.
    pub fn delete_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<()> {
        self.delete_resource(EntityKind::Environment, id, &scope.item_path(id))
    }

    /// List the environments in a scope.
    pub fn list_environments(&self, scope: &EnvironmentScope) -> Result<Vec<Environment>> {
        let name = scope.to_string();
        self.list_resource(EntityKind::Environment, &name, &scope.collection_path())
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn create_resource(
        &self,
        kind: EntityKind,
        name: &str,
        path: &str,
        body: Body,
    ) -> Result<String> {
        let response = self.send(Method::Post, path, body)?;
        check(&response, Operation::Create, kind, name)?;

        let id = envelope::extract_id(&response.body, kind).map_err(|message| Error::Decode {
            operation: Operation::Create,
            kind,
            name: name.to_string(),
            message,
        })?;
        log::info!("Created {kind} {name} with {} {id}", kind.id_field());
        Ok(id)
    }

    fn read_resource<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        id: &str,
        path: &str,
    ) -> Result<T> {
        let response = self.send(Method::Get, path, Body::Empty)?;
        check(&response, Operation::Read, kind, id)?;
        decode_data(&response, Operation::Read, kind, id)
    }

    fn update_resource<T, B>(&self, kind: EntityKind, id: &str, path: &str, record: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        if !kind.supports_update() {
            return Err(Error::UpdateNotSupported {
                kind,
                name: id.to_string(),
            });
        }
        let body = self.json_body(Operation::Update, kind, id, record)?;
        let response = self.send(Method::Put, path, body)?;
        check(&response, Operation::Update, kind, id)?;
        decode_data(&response, Operation::Update, kind, id)
    }

    fn delete_resource(&self, kind: EntityKind, id: &str, path: &str) -> Result<()> {
        let response = self.send(Method::Delete, path, Body::Empty)?;
        if response.is_success() {
            log::info!("Deleted {kind} {id}");
            return Ok(());
        }
        if kind.is_gone(response.status) {
            log::debug!("{kind} {id} already gone (status {})", response.status);
            return Ok(());
        }
        check(&response, Operation::Delete, kind, id)
    }

    fn list_resource<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        name: &str,
        path: &str,
    ) -> Result<Vec<T>> {
        let response = self.send(Method::Get, path, Body::Empty)?;
        check(&response, Operation::List, kind, name)?;
        decode_data(&response, Operation::List, kind, name)
    }

    fn json_body<B: Serialize>(
        &self,
        operation: Operation,
        kind: EntityKind,
        name: &str,
        record: &B,
    ) -> Result<Body> {
        Body::json(record).map_err(|e| Error::Decode {
            operation,
            kind,
            name: name.to_string(),
            message: format!("failed to encode request body: {e}"),
        })
    }

    fn send(&self, method: Method, path: &str, body: Body) -> Result<Response> {
        let request = Request::build(&self.config, method, path, body)?;
        log::debug!("{method} {} {}", request.url, request.body_for_log());

        let response = self.transport.execute(&request)?;
        log::debug!(
            "{method} {} -> {} {}",
            request.url,
            response.status,
            response.body_text()
        );
        Ok(response)
    }
}

/// Turn a status of 300 or above into a rejection carrying the API's reason.
fn check(response: &Response, operation: Operation, kind: EntityKind, name: &str) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(Error::Rejected {
        operation,
        kind,
        name: name.to_string(),
        status: response.status,
        reason: envelope::decode_error(&response.body).map(|e| e.message),
    })
}

fn decode_data<T: DeserializeOwned>(
    response: &Response,
    operation: Operation,
    kind: EntityKind,
    name: &str,
) -> Result<T> {
    envelope::decode::<T>(&response.body)
        .map(|envelope| envelope.data)
        .map_err(|message| Error::Decode {
            operation,
            kind,
            name: name.to_string(),
            message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::transport::MockTransport;
    use crate::types::Integration;

    fn setup() -> (Client, MockTransport) {
        let mock = MockTransport::new();
        let config = ClientConfig::new("https://api.runscope.test", "tok").unwrap();
        let client = Client::with_transport(config, Box::new(mock.clone()));
        (client, mock)
    }

    fn bucket(client: &Client) -> String {
        client.create_bucket(&Bucket::new("t", "T1")).unwrap()
    }

    #[test]
    fn test_create_bucket_then_read() {
        let (client, mock) = setup();
        let key = bucket(&client);
        assert_eq!(key, "b1");

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body.encode(), b"name=t&team_uuid=T1".to_vec());

        let read = client.read_bucket(&key).unwrap();
        assert_eq!(read.key, "b1");
        assert_eq!(read.name, "t");
        assert_eq!(read.team.id, "T1");
    }

    #[test]
    fn test_requests_carry_auth_headers() {
        let (client, mock) = setup();
        client.list_buckets().unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.url, "https://api.runscope.test/buckets");
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        assert_eq!(request.header("Accept"), Some("application/json"));
    }

    #[test]
    fn test_unknown_bucket_is_absent() {
        let (client, _mock) = setup();
        let err = client.read_bucket("missing").unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_bucket_server_error_is_not_absence() {
        let (client, mock) = setup();
        mock.respond_once(Method::Get, "/buckets/b9", Response::new(500, "oops"));

        let err = client.read_bucket("b9").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn test_bucket_update_not_supported() {
        let (client, mock) = setup();
        let err = client.update_bucket(&Bucket::new("t", "T1")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unsupported);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_debug_omits_token() {
        let (client, _mock) = setup();
        let debug = format!("{client:?}");
        assert!(debug.contains("api.runscope.test"));
        assert!(!debug.contains("tok\""));
    }

    #[test]
    fn test_create_rejection_carries_reason() {
        let (client, _mock) = setup();
        let err = client.create_bucket(&Bucket::new("", "T1")).unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("name and team_uuid are required"));
    }

    #[test]
    fn test_create_without_id_is_decode_error() {
        let (client, mock) = setup();
        let key = bucket(&client);
        let path = format!("/buckets/{key}/tests");
        mock.respond_once(
            Method::Post,
            &path,
            Response::new(201, r#"{"meta":{"status":"success"},"data":{"name":"smoke"}}"#),
        );

        let err = client.create_test(&Test::new(&key, "smoke")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_malformed_success_body_is_decode_error() {
        let (client, mock) = setup();
        mock.respond_once(Method::Get, "/buckets/b1", Response::new(200, "<html>"));

        let err = client.read_bucket("b1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_test_lifecycle() {
        let (client, _mock) = setup();
        let key = bucket(&client);

        let id = client
            .create_test(&Test::new(&key, "smoke").with_description("homepage"))
            .unwrap();
        let mut test = client.read_test(&key, &id).unwrap();
        assert_eq!(test.name, "smoke");
        assert_eq!(test.description, "homepage");
        assert_eq!(test.bucket_key, key);

        test.description = "homepage and login".to_string();
        let updated = client.update_test(&test).unwrap();
        assert_eq!(updated.description, "homepage and login");
        assert_eq!(client.read_test(&key, &id).unwrap(), updated);

        assert_eq!(client.list_tests(&key).unwrap().len(), 1);

        client.delete_test(&key, &id).unwrap();
        assert!(client.read_test(&key, &id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_of_missing_entity_succeeds() {
        let (client, _mock) = setup();
        let key = bucket(&client);
        client.delete_test(&key, "t404").unwrap();
        client.delete_bucket(&key).unwrap();
        client.delete_bucket(&key).unwrap();
    }

    #[test]
    fn test_delete_forbidden_is_an_error() {
        let (client, mock) = setup();
        mock.respond_once(Method::Delete, "/buckets/b1", Response::new(403, ""));
        let err = client.delete_bucket("b1").unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_shared_environment_lifecycle() {
        let (client, mock) = setup();
        let key = bucket(&client);
        let scope = EnvironmentScope::resolve(&key, None);

        let mut env = Environment::new("staging");
        env.script = "set('x', 1);".to_string();
        env.initial_variables
            .insert("base_url".to_string(), "https://staging.test".to_string());
        env.integrations.push(Integration::new("slack"));

        let id = client.create_environment(&scope, &env).unwrap();
        assert_eq!(
            mock.last_request().unwrap().path,
            format!("/buckets/{key}/environments")
        );

        let read = client.read_environment(&scope, &id).unwrap();
        assert_eq!(read.name, "staging");
        assert_eq!(read.script, env.script);
        assert_eq!(read.initial_variables, env.initial_variables);
        assert_eq!(read.integrations, env.integrations);
        assert_eq!(read.test_id, None);

        let mut changed = read.clone();
        changed.preserve_cookies = true;
        let updated = client.update_environment(&scope, &changed).unwrap();
        assert!(updated.preserve_cookies);

        client.delete_environment(&scope, &id).unwrap();
        assert!(client.read_environment(&scope, &id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_test_scoped_environment_routing() {
        let (client, mock) = setup();
        let key = bucket(&client);
        let test = client.create_test(&Test::new(&key, "smoke")).unwrap();
        let scope = EnvironmentScope::resolve(&key, Some(&test));

        let id = client
            .create_environment(&scope, &Environment::new("local"))
            .unwrap();
        assert_eq!(
            mock.last_request().unwrap().path,
            format!("/buckets/{key}/tests/{test}/environments")
        );

        let read = client.read_environment(&scope, &id).unwrap();
        assert_eq!(read.test_id.as_deref(), Some(test.as_str()));
        assert_eq!(client.list_environments(&scope).unwrap().len(), 1);

        let shared = EnvironmentScope::resolve(&key, None);
        assert!(client.read_environment(&shared, &id).unwrap_err().is_not_found());
        assert!(client.list_environments(&shared).unwrap().is_empty());
    }

    #[test]
    fn test_forbidden_environment_is_not_absence() {
        let (client, mock) = setup();
        let scope = EnvironmentScope::resolve("b1", None);
        mock.respond_once(
            Method::Get,
            &scope.item_path("e1"),
            Response::new(403, r#"{"error":{"status":403,"error":"Forbidden"}}"#),
        );

        let err = client.read_environment(&scope, "e1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Rejected);
    }
}
