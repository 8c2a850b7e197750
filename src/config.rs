use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_REMOTE_URL: &str = "https://backend.nurdcells.com";
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL `{url}`: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Where the two endpoint families live and how long a request may take.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Phone-keyed family (add/withdraw money, signup, member login).
    pub remote_base_url: Url,
    /// Identifier-keyed family (check id, add money, transfer to member).
    pub local_base_url: Url,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(remote: &str, local: &str, request_timeout: Duration) -> Result<Self, ConfigError> {
        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self {
            remote_base_url: parse_base_url(remote)?,
            local_base_url: parse_base_url(local)?,
            request_timeout,
        })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            remote_base_url: Url::parse(DEFAULT_REMOTE_URL).expect("default remote URL is valid"),
            local_base_url: Url::parse(DEFAULT_LOCAL_URL).expect("default local URL is valid"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::Url {
        url: raw.to_owned(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidScheme(other.to_owned())),
    }
}
