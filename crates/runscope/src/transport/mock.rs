//! In-memory stand-in for the Runscope API.
//!
//! [`MockTransport`] answers requests the way the API does: it assigns keys
//! and identifiers on creation, echoes records in envelopes, answers 403 for
//! unknown bucket keys and 404 for other unknown entities, and rejects bucket
//! creation unless the body is form-encoded. One-shot scripted responses can
//! be queued per method and path to simulate failures.

use crate::error::Result;
use crate::transport::{Body, Method, Request, Response, Transport};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock transport for testing without network access.
///
/// Clones share the same in-memory API, so a test can keep a handle for
/// inspection after handing a clone to a client.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// (bucket key, owning test id, environment id)
type EnvironmentKey = (String, Option<String>, String);

#[derive(Debug, Default)]
struct MockState {
    counters: HashMap<&'static str, u64>,
    buckets: BTreeMap<String, Value>,
    tests: BTreeMap<(String, String), Value>,
    environments: BTreeMap<EnvironmentKey, Value>,
    scripted: HashMap<(Method, String), VecDeque<Response>>,
    requests: Vec<Request>,
}

impl MockTransport {
    /// Create a new empty mock API.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next request matching `method` and `path`.
    ///
    /// Scripted responses take priority over the simulated API and are used
    /// once each, in the order queued.
    pub fn respond_once(&self, method: Method, path: &str, response: Response) {
        self.state()
            .scripted
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<Request> {
        self.state().requests.last().cloned()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &Request) -> Result<Response> {
        let mut state = self.state();
        state.requests.push(request.clone());

        let scripted = state
            .scripted
            .get_mut(&(request.method, request.path.clone()))
            .and_then(VecDeque::pop_front);
        if let Some(response) = scripted {
            return Ok(response);
        }

        Ok(state.route(request))
    }
}

impl MockState {
    fn next_id(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter += 1;
        format!("{prefix}{counter}")
    }

    fn route(&mut self, request: &Request) -> Response {
        let path = request.path.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let body = &request.body;

        match (request.method, segments.as_slice()) {
            (Method::Get, ["buckets"]) => {
                success(200, Value::Array(self.buckets.values().cloned().collect()))
            }
            (Method::Post, ["buckets"]) => self.create_bucket(body),
            (Method::Get, ["buckets", key]) => match self.buckets.get(*key) {
                Some(bucket) => success(200, bucket.clone()),
                None => failure(403, "Forbidden"),
            },
            (Method::Delete, ["buckets", key]) => self.delete_bucket(key),
            (_, ["buckets", key, ..]) if !self.buckets.contains_key(*key) => {
                failure(404, "Bucket not found")
            }
            (Method::Get, ["buckets", key, "tests"]) => {
                let tests = self
                    .tests
                    .iter()
                    .filter(|((bucket, _), _)| bucket == key)
                    .map(|(_, test)| test.clone())
                    .collect();
                success(200, Value::Array(tests))
            }
            (Method::Post, ["buckets", key, "tests"]) => self.create_test(key, body),
            (Method::Get, ["buckets", key, "tests", id]) => {
                match self.tests.get(&(key.to_string(), id.to_string())) {
                    Some(test) => success(200, test.clone()),
                    None => failure(404, "Test not found"),
                }
            }
            (Method::Put, ["buckets", key, "tests", id]) => {
                let id = (key.to_string(), id.to_string());
                update_record(self.tests.get_mut(&id), body, "Test not found")
            }
            (Method::Delete, ["buckets", key, "tests", id]) => self.delete_test(key, id),
            (method, ["buckets", key, "environments", rest @ ..]) => {
                self.environments(method, key, None, rest, body)
            }
            (method, ["buckets", key, "tests", test, "environments", rest @ ..]) => {
                if self
                    .tests
                    .contains_key(&(key.to_string(), test.to_string()))
                {
                    self.environments(method, key, Some(test), rest, body)
                } else {
                    failure(404, "Test not found")
                }
            }
            _ => failure(405, "Method not allowed"),
        }
    }

    fn create_bucket(&mut self, body: &Body) -> Response {
        let Body::Form(fields) = body else {
            return failure(415, "Expected form-encoded body");
        };
        let field = |name: &str| {
            fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .filter(|value| !value.is_empty())
        };
        let (Some(name), Some(team)) = (field("name"), field("team_uuid")) else {
            return failure(400, "name and team_uuid are required");
        };

        let key = self.next_id("b");
        let bucket = json!({
            "key": key,
            "name": name,
            "team": {"id": team},
            "default": false,
            "verify_ssl": true,
        });
        self.buckets.insert(key, bucket.clone());
        success(201, bucket)
    }

    fn delete_bucket(&mut self, key: &str) -> Response {
        if self.buckets.remove(key).is_none() {
            return failure(404, "Bucket not found");
        }
        self.tests.retain(|(bucket, _), _| bucket != key);
        self.environments.retain(|(bucket, _, _), _| bucket != key);
        no_content()
    }

    fn create_test(&mut self, bucket: &str, body: &Body) -> Response {
        let Some(mut fields) = json_object(body) else {
            return failure(400, "Expected JSON object body");
        };
        if !has_name(&fields) {
            return failure(400, "name is required");
        }

        let id = self.next_id("t");
        fields.insert("id".to_string(), Value::String(id.clone()));
        fields.entry("description").or_insert(Value::Null);
        let test = Value::Object(fields);
        self.tests.insert((bucket.to_string(), id), test.clone());
        success(201, test)
    }

    fn delete_test(&mut self, bucket: &str, id: &str) -> Response {
        if self
            .tests
            .remove(&(bucket.to_string(), id.to_string()))
            .is_none()
        {
            return failure(404, "Test not found");
        }
        self.environments
            .retain(|(b, test, _), _| !(b == bucket && test.as_deref() == Some(id)));
        no_content()
    }

    fn environments(
        &mut self,
        method: Method,
        bucket: &str,
        test: Option<&str>,
        rest: &[&str],
        body: &Body,
    ) -> Response {
        let owner = test.map(str::to_string);
        match (method, rest) {
            (Method::Get, []) => {
                let environments = self
                    .environments
                    .iter()
                    .filter(|((b, t, _), _)| b == bucket && *t == owner)
                    .map(|(_, env)| env.clone())
                    .collect();
                success(200, Value::Array(environments))
            }
            (Method::Post, []) => {
                let Some(mut fields) = json_object(body) else {
                    return failure(400, "Expected JSON object body");
                };
                if !has_name(&fields) {
                    return failure(400, "name is required");
                }
                let id = self.next_id("e");
                fields.insert("id".to_string(), Value::String(id.clone()));
                if let Some(test) = test {
                    fields.insert("test_id".to_string(), Value::String(test.to_string()));
                }
                let env = Value::Object(fields);
                self.environments
                    .insert((bucket.to_string(), owner, id), env.clone());
                success(201, env)
            }
            (Method::Get, [id]) => {
                match self
                    .environments
                    .get(&(bucket.to_string(), owner, id.to_string()))
                {
                    Some(env) => success(200, env.clone()),
                    None => failure(404, "Environment not found"),
                }
            }
            (Method::Put, [id]) => {
                let key = (bucket.to_string(), owner, id.to_string());
                update_record(self.environments.get_mut(&key), body, "Environment not found")
            }
            (Method::Delete, [id]) => {
                match self
                    .environments
                    .remove(&(bucket.to_string(), owner, id.to_string()))
                {
                    Some(_) => no_content(),
                    None => failure(404, "Environment not found"),
                }
            }
            _ => failure(405, "Method not allowed"),
        }
    }
}

/// Apply a PUT body to a stored record, keeping its identifier.
fn update_record(record: Option<&mut Value>, body: &Body, missing: &str) -> Response {
    let Some(Value::Object(stored)) = record else {
        return failure(404, missing);
    };
    let Some(fields) = json_object(body) else {
        return failure(400, "Expected JSON object body");
    };
    for (name, value) in fields {
        if name != "id" {
            stored.insert(name, value);
        }
    }
    success(200, Value::Object(stored.clone()))
}

fn json_object(body: &Body) -> Option<Map<String, Value>> {
    match body {
        Body::Json(bytes) => match serde_json::from_slice(bytes) {
            Ok(Value::Object(fields)) => Some(fields),
            _ => None,
        },
        Body::Empty | Body::Form(_) => None,
    }
}

fn has_name(fields: &Map<String, Value>) -> bool {
    matches!(fields.get("name"), Some(Value::String(name)) if !name.is_empty())
}

fn success(status: u16, data: Value) -> Response {
    let body = json!({"meta": {"status": "success"}, "data": data, "error": null});
    Response::new(status, body.to_string())
}

fn failure(status: u16, message: &str) -> Response {
    let body = json!({
        "meta": {"status": "error"},
        "data": null,
        "error": {"status": status, "error": message},
    });
    Response::new(status, body.to_string())
}

fn no_content() -> Response {
    Response::new(204, Vec::new())
}
