//! Mock remote configuration.

/// Credentials accepted by the token endpoint, and where to listen.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Client id accepted in the Basic authorization header.
    pub client_id: String,
    /// Client secret accepted in the Basic authorization header.
    pub client_secret: String,
    /// `expires_in` reported for every issued token.
    pub token_ttl_secs: u64,
    /// Port to listen on (default `4000`).
    pub listen_port: u16,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            client_id: "mcpbridge-dev".to_string(),
            client_secret: "mcpbridge-dev-secret".to_string(),
            token_ttl_secs: 3600,
            listen_port: 4000,
        }
    }
}

impl MockConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable               | Default                |
    /// |------------------------|------------------------|
    /// | `MOCK_REMOTE_PORT`     | `4000`                 |
    /// | `MOCK_CLIENT_ID`       | `mcpbridge-dev`        |
    /// | `MOCK_CLIENT_SECRET`   | `mcpbridge-dev-secret` |
    /// | `MOCK_TOKEN_TTL_SECS`  | `3600`                 |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: std::env::var("MOCK_CLIENT_ID").unwrap_or(defaults.client_id),
            client_secret: std::env::var("MOCK_CLIENT_SECRET").unwrap_or(defaults.client_secret),
            token_ttl_secs: std::env::var("MOCK_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_ttl_secs),
            listen_port: std::env::var("MOCK_REMOTE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.listen_port),
        }
    }
}
