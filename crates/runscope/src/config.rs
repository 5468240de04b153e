//! Client configuration.
//!
//! A [`ClientConfig`] is built once, validated, and handed to the client. It is
//! never read from ambient state after construction.

use crate::error::{Error, Result};
use std::fmt;
use url::Url;

/// Default Runscope API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.runscope.com";

/// Environment variable holding the API access token.
pub const ENV_ACCESS_TOKEN: &str = "RUNSCOPE_ACCESS_TOKEN";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "RUNSCOPE_API_URL";

/// Immutable connection settings: base URL and bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_url: Url,
    access_token: String,
}

impl ClientConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a malformed or non-HTTP base URL or an
    /// empty token.
    pub fn new(api_url: &str, access_token: impl Into<String>) -> Result<Self> {
        let api_url = Url::parse(api_url.trim())?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "API URL must use http or https, got {}",
                api_url.scheme()
            )));
        }
        if api_url.cannot_be_a_base() || api_url.host_str().is_none() {
            return Err(Error::config(format!("API URL has no host: {api_url}")));
        }

        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::config("access token is empty"));
        }

        Ok(Self {
            api_url,
            access_token,
        })
    }

    /// Build a configuration from `RUNSCOPE_API_URL` and `RUNSCOPE_ACCESS_TOKEN`.
    ///
    /// `api_url` takes priority over the environment when given.
    pub fn from_env(api_url: Option<&str>) -> Result<Self> {
        let env_url = std::env::var(ENV_API_URL).ok();
        let url = api_url
            .or(env_url.as_deref())
            .unwrap_or(DEFAULT_API_URL);
        let token = std::env::var(ENV_ACCESS_TOKEN)
            .map_err(|_| Error::config(format!("{ENV_ACCESS_TOKEN} is not set")))?;

        let config = Self::new(url, token)?;
        log::info!("Runscope client configured for {}", config.api_url);
        Ok(config)
    }

    /// The validated base URL.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// The bearer token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Resolve an API path such as `/buckets/abc` against the base URL.
    ///
    /// The path is appended to whatever path prefix the base URL carries.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.api_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("access_token", &"<redacted>")
            .finish()
    }
}
