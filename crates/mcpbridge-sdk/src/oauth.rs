//! OAuth2 client-credentials exchange.
//!
//! Posts `grant_type=client_credentials` to the token endpoint with HTTP
//! Basic client authentication and turns the answer into a [`Credential`].
//! Failures are returned as-is; retrying is the caller's decision.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::credentials::Credential;
use crate::error::TokenError;

/// Where and how to request tokens.
#[derive(Clone)]
pub struct TokenEndpoint {
    url: Url,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    timeout: Duration,
}

impl TokenEndpoint {
    /// Token endpoint settings taken from the bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            timeout: config.token_timeout,
        }
    }

    /// The `Authorization: Basic …` header value for this client.
    pub fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(pair))
    }

    /// The form body. The client secret is never part of it.
    pub fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![("grant_type", "client_credentials")];
        if let Some(scope) = self.scope.as_deref() {
            form.push(("scope", scope));
        }
        form
    }
}

/// Success body of the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<f64>,
}

/// Exchange the client credentials for a new [`Credential`].
///
/// The whole call, including reading the body, is bounded by the endpoint's
/// timeout; running out of time yields a status-0 [`TokenError`].
pub async fn exchange_client_credentials(
    http: &reqwest::Client,
    endpoint: &TokenEndpoint,
) -> Result<Credential, TokenError> {
    let started = Instant::now();

    let call = async {
        let res = http
            .post(endpoint.url.clone())
            .header(AUTHORIZATION, endpoint.basic_authorization())
            .header(ACCEPT, "application/json")
            .form(&endpoint.form())
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    };

    let (status, text) = match tokio::time::timeout(endpoint.timeout, call).await {
        Err(_) => return Err(TokenError::timed_out(endpoint.timeout)),
        Ok(Err(e)) if e.is_timeout() => return Err(TokenError::timed_out(endpoint.timeout)),
        Ok(Err(e)) => {
            return Err(TokenError::new(
                e.status().map_or(0, |s| s.as_u16()),
                format!("failed to reach token endpoint: {e}"),
            ))
        }
        Ok(Ok(answer)) => answer,
    };

    if !status.is_success() {
        return Err(TokenError::new(
            status.as_u16(),
            format!("token endpoint returned {status}: {}", text.trim()),
        ));
    }

    let body: TokenResponse = serde_json::from_str(&text).map_err(|e| {
        TokenError::new(status.as_u16(), format!("invalid token response: {e}"))
    })?;

    let access_token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TokenError::new(status.as_u16(), "token response has no access_token"))?;

    // Negative, non-finite or absurdly large lifetimes are treated as absent.
    let expires_in = body
        .expires_in
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        expires_in_secs = expires_in.map(|d| d.as_secs()),
        "token exchange succeeded"
    );

    Ok(Credential::issued(
        access_token,
        body.token_type,
        expires_in,
        Instant::now(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(scope: Option<&str>) -> TokenEndpoint {
        TokenEndpoint {
            url: Url::parse("http://localhost/token").unwrap(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            scope: scope.map(String::from),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn basic_header_encodes_id_and_secret() {
        // base64("client:secret")
        assert_eq!(
            endpoint(None).basic_authorization(),
            "Basic Y2xpZW50OnNlY3JldA=="
        );
    }

    #[test]
    fn form_without_scope() {
        let ep = endpoint(None);
        assert_eq!(ep.form(), vec![("grant_type", "client_credentials")]);
    }

    #[test]
    fn form_with_scope_and_no_secret() {
        let ep = endpoint(Some("mcp:read mcp:write"));
        let form = ep.form();
        assert_eq!(
            form,
            vec![
                ("grant_type", "client_credentials"),
                ("scope", "mcp:read mcp:write")
            ]
        );
        assert!(form.iter().all(|(_, v)| *v != "secret"));
    }
}
