//! Transport abstraction for executing API requests.
//!
//! This module provides the [`Transport`] trait and the request/response types
//! it moves. The primary implementation is [`http::HttpTransport`]; tests use
//! [`MockTransport`], an in-memory stand-in for the API.
//!
//! Transports only move bytes. Building headers happens in [`Request::build`]
//! and classifying statuses happens in the client.
//!
//! # Testing
//!
//! ```
//! use runscope::transport::{Body, Method, MockTransport, Request, Transport};
//! use runscope::ClientConfig;
//!
//! let config = ClientConfig::new("https://api.runscope.test", "token").unwrap();
//! let mock = MockTransport::new();
//!
//! let request = Request::build(&config, Method::Get, "/buckets", Body::Empty).unwrap();
//! let response = mock.execute(&request).unwrap();
//! assert_eq!(response.status, 200);
//! ```

pub mod http;
pub mod mock;

use crate::config::ClientConfig;
use crate::error::Result;
use std::fmt;

pub use mock::MockTransport;

/// Content type for JSON bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type for form submissions.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Transport trait for executing requests.
///
/// Implementations return every HTTP response, whatever its status. Only a
/// failure to obtain a response at all is an error.
pub trait Transport: Send + Sync {
    /// Execute a request and return the raw response.
    fn execute(&self, request: &Request) -> Result<Response>;
}

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// No body.
    Empty,
    /// Serialized JSON.
    Json(Vec<u8>),
    /// Form fields, encoded as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

impl Body {
    /// Serialize a value as a JSON body.
    pub fn json<T: serde::Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::Json(serde_json::to_vec(value)?))
    }

    /// Bytes to put on the wire.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Json(bytes) => bytes.clone(),
            Self::Form(fields) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish()
                .into_bytes(),
        }
    }

    /// Whether the body has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A fully-formed request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// API path, relative to the base URL.
    pub path: String,
    /// Absolute URL.
    pub url: String,
    /// Headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Payload.
    pub body: Body,
}

impl Request {
    /// Build an authenticated request for `path` under the configured base URL.
    ///
    /// Every request carries a bearer token and `Accept: application/json`.
    /// Non-GET requests carry a content type: form-encoded for form bodies,
    /// JSON otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the resulting URL is malformed.
    pub fn build(config: &ClientConfig, method: Method, path: &str, body: Body) -> Result<Self> {
        let url = config.endpoint(path)?;

        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", config.access_token()),
            ),
            ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
        ];
        if method != Method::Get {
            let content_type = match body {
                Body::Form(_) => CONTENT_TYPE_FORM,
                Body::Empty | Body::Json(_) => CONTENT_TYPE_JSON,
            };
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        Ok(Self {
            method,
            path: path.to_string(),
            url: url.into(),
            headers,
            body,
        })
    }

    /// Look up a header value, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body rendered for debug logs.
    #[must_use]
    pub fn body_for_log(&self) -> String {
        match &self.body {
            Body::Empty => String::new(),
            Body::Json(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Body::Form(fields) => format!("{fields:?}"),
        }
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is below 300.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    /// Body as text, for logging.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
