//! Bridge configuration.
//!
//! [`RawConfig`] holds the settings as the user typed them (flags or
//! environment). [`BridgeConfig`] is the validated form the core is built
//! from; converting one into the other is the only place configuration
//! errors can arise.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Unvalidated settings.
#[derive(Clone, Default)]
pub struct RawConfig {
    /// JSON-RPC endpoint to forward to.
    pub remote_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Optional OAuth2 scope.
    pub scope: Option<String>,
    /// Deadline for each call to the remote endpoint.
    pub remote_timeout: Duration,
    /// Deadline for each call to the token endpoint.
    pub token_timeout: Duration,
}

/// Validated configuration for one bridge instance.
#[derive(Clone)]
pub struct BridgeConfig {
    /// JSON-RPC endpoint to forward to.
    pub remote_url: Url,
    /// OAuth2 token endpoint.
    pub token_url: Url,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret. Never printed.
    pub client_secret: String,
    /// OAuth2 scope, `None` when not configured.
    pub scope: Option<String>,
    /// Deadline for each call to the remote endpoint.
    pub remote_timeout: Duration,
    /// Deadline for each call to the token endpoint.
    pub token_timeout: Duration,
}

impl TryFrom<RawConfig> for BridgeConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let remote_url = parse_url("remote_url", &raw.remote_url)?;
        let token_url = parse_url("token_url", &raw.token_url)?;
        let client_id = required("client_id", raw.client_id)?;
        let client_secret = required("client_secret", raw.client_secret)?;

        if raw.remote_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "remote_timeout",
            });
        }
        if raw.token_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "token_timeout",
            });
        }

        let scope = raw
            .scope
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            remote_url,
            token_url,
            client_id,
            client_secret,
            scope,
            remote_timeout: raw.remote_timeout,
            token_timeout: raw.token_timeout,
        })
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("remote_url", &self.remote_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scope", &self.scope)
            .field("remote_timeout", &self.remote_timeout)
            .field("token_timeout", &self.token_timeout)
            .finish()
    }
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("remote_url", &self.remote_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scope", &self.scope)
            .field("remote_timeout", &self.remote_timeout)
            .field("token_timeout", &self.token_timeout)
            .finish()
    }
}

fn required(field: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing { field })
    } else {
        Ok(value)
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing { field });
    }

    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}
