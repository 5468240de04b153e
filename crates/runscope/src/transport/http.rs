//! Blocking HTTP transport.
//!
//! This module provides the [`HttpTransport`] implementation backed by a
//! shared `ureq` agent.

use crate::error::Result;
use crate::transport::{Method, Request, Response, Transport};

/// Maximum response size accepted from the API.
const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// HTTP transport.
///
/// The agent is configured to hand back 4xx and 5xx responses instead of
/// turning them into errors, so the client can decode the error envelope.
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &Request,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for HttpTransport {
    fn execute(&self, request: &Request) -> Result<Response> {
        let url = request.url.as_str();
        let mut response = match request.method {
            Method::Get => with_headers(self.agent.get(url), request).call()?,
            Method::Delete => with_headers(self.agent.delete(url), request).call()?,
            Method::Post => {
                let body = request.body.encode();
                with_headers(self.agent.post(url), request).send(body.as_slice())?
            }
            Method::Put => {
                let body = request.body.encode();
                with_headers(self.agent.put(url), request).send(body.as_slice())?
            }
        };

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()?;

        Ok(Response { status, body })
    }
}
