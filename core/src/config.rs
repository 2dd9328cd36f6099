//! Client configuration.
//!
//! `ClientConfig` can be built in code, deserialized from any serde source,
//! or read from `ENF_*` environment variables. The base URL is normalized
//! when the client is constructed: a missing scheme, or any scheme other than
//! `http`/`https`, becomes `https`.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.xaptum.io";
pub const ENV_PREFIX: &str = "ENF";

const HTTP_SCHEME: &str = "http";
const HTTPS_SCHEME: &str = "https";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url `{url}`: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme in base url `{0}`")]
    UnsupportedScheme(String),

    #[error("request timeout ({request:?}) is shorter than connect timeout ({connect:?})")]
    ConflictingTimeouts { connect: Duration, request: Duration },

    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
    /// Bearer token to start with. Authenticating replaces it.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
    /// Connection establishment limit for the default transport.
    #[serde(default = "defaults::connect_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connect_timeout: Duration,
    /// Overall per-request limit for the default transport.
    #[serde(default = "defaults::request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

// Manual impl keeps the token out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            user_agent: defaults::user_agent(),
            connect_timeout: defaults::connect_timeout(),
            request_timeout: defaults::request_timeout(),
        }
    }

    /// Read `ENF_BASE_URL`, `ENF_TOKEN`, `ENF_USER_AGENT`,
    /// `ENF_CONNECT_TIMEOUT` and `ENF_REQUEST_TIMEOUT` (seconds).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, ConfigError> {
        let source = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?;
        Ok(source.try_deserialize()?)
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve_base_url().map(|_| ())
    }

    /// Check the whole configuration and return the normalized base URL,
    /// without a trailing slash.
    pub(crate) fn resolve_base_url(&self) -> Result<String, ConfigError> {
        if self.request_timeout < self.connect_timeout {
            return Err(ConfigError::ConflictingTimeouts {
                connect: self.connect_timeout,
                request: self.request_timeout,
            });
        }
        let url = normalize_base_url(&self.base_url)?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let invalid = |source| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    };

    let mut url = match Url::parse(raw) {
        Ok(url) if url.has_host() => url,
        // "api.example.com" or "localhost:9090": no usable scheme
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("{HTTPS_SCHEME}://{raw}")).map_err(invalid)?
        }
        Err(source) => return Err(invalid(source)),
    };

    if url.scheme() != HTTP_SCHEME && url.scheme() != HTTPS_SCHEME {
        url.set_scheme(HTTPS_SCHEME)
            .map_err(|()| ConfigError::UnsupportedScheme(raw.to_string()))?;
    }
    Ok(url)
}

mod defaults {
    use std::time::Duration;

    pub fn base_url() -> String {
        super::DEFAULT_BASE_URL.to_string()
    }

    pub fn user_agent() -> String {
        format!("enf-rs/{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(5)
    }

    pub fn request_timeout() -> Duration {
        Duration::from_secs(20)
    }
}
