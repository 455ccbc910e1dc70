//! Shared bearer-token cache with single-flight refresh.
//!
//! [`TokenCache`] owns the one [`Credential`] of a bridge instance and the
//! token exchange currently in progress, if any. Callers only ever receive a
//! copy of the token string.
//!
//! # Single flight
//!
//! A refresh is a [`Shared`] future stored next to the credential. The
//! first caller that finds no refresh in progress creates it; every caller
//! that arrives while it is pending awaits a clone of the same future, so
//! concurrent callers cause exactly one request to the token endpoint and
//! all observe the same outcome. The marker is released by a drop guard
//! inside the future, so it is cleared on success and on failure alike.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::credentials::{fingerprint, Credential};
use crate::error::TokenError;
use crate::oauth::{exchange_client_credentials, TokenEndpoint};

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, TokenError>>>;

struct InFlight {
    generation: u64,
    refresh: RefreshFuture,
}

#[derive(Default)]
struct CacheState {
    credential: Option<Credential>,
    in_flight: Option<InFlight>,
    generation: u64,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    // The state is a pair of plain assignments; a panic elsewhere cannot
    // leave it half-written.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight marker when the refresh future finishes or is dropped.
struct ReleaseInFlight {
    state: Weak<Mutex<CacheState>>,
    generation: u64,
}

impl Drop for ReleaseInFlight {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        if state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == self.generation)
        {
            state.in_flight = None;
        }
    }
}

/// Token cache for one set of client credentials.
///
/// Cheap to clone; clones share the same credential and refresh.
#[derive(Clone)]
pub struct TokenCache {
    http: reqwest::Client,
    endpoint: Arc<TokenEndpoint>,
    state: Arc<Mutex<CacheState>>,
}

impl TokenCache {
    /// Build a cache from the bridge configuration.
    pub fn new(config: &BridgeConfig, http: reqwest::Client) -> Self {
        Self::with_endpoint(TokenEndpoint::from_config(config), http)
    }

    /// Build a cache for an explicit token endpoint.
    pub fn with_endpoint(endpoint: TokenEndpoint, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: Arc::new(endpoint),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Return a usable token, refreshing only when none is cached or the
    /// cached one is within the expiry buffer.
    pub async fn get_token(&self) -> Result<String, TokenError> {
        {
            let state = lock(&self.state);
            if let Some(credential) = &state.credential {
                if credential.is_usable_at(Instant::now()) {
                    return Ok(credential.access_token().to_string());
                }
                debug!("cached token is expiring, refreshing");
            }
        }
        self.refresh_token().await
    }

    /// Obtain a fresh token, joining the refresh already in progress if
    /// there is one.
    ///
    /// On failure the cached credential is left untouched and every caller
    /// that joined the refresh receives the same error.
    pub async fn refresh_token(&self) -> Result<String, TokenError> {
        let refresh = {
            let mut state = lock(&self.state);
            match &state.in_flight {
                Some(in_flight) => {
                    debug!("joining token refresh in progress");
                    in_flight.refresh.clone()
                }
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let refresh = self.start_refresh(generation);
                    state.in_flight = Some(InFlight {
                        generation,
                        refresh: refresh.clone(),
                    });
                    refresh
                }
            }
        };

        refresh
            .await
            .map(|credential| credential.access_token().to_string())
    }

    /// Forget the cached credential. Does not start a refresh.
    pub fn invalidate_token(&self) {
        let mut state = lock(&self.state);
        if state.credential.take().is_some() {
            info!("cached token invalidated");
        }
    }

    /// A copy of the cached credential, if any.
    pub fn cached(&self) -> Option<Credential> {
        lock(&self.state).credential.clone()
    }

    fn start_refresh(&self, generation: u64) -> RefreshFuture {
        let http = self.http.clone();
        let endpoint = Arc::clone(&self.endpoint);
        let state = Arc::downgrade(&self.state);

        async move {
            let _release = ReleaseInFlight {
                state: state.clone(),
                generation,
            };

            let result = exchange_client_credentials(&http, &endpoint).await;
            match &result {
                Ok(credential) => {
                    info!(
                        token = %fingerprint(credential.access_token()),
                        token_type = credential.token_type(),
                        "obtained new access token"
                    );
                    if let Some(state) = state.upgrade() {
                        lock(&state).credential = Some(credential.clone());
                    }
                }
                Err(e) => warn!(status = e.status, error = %e, "token exchange failed"),
            }
            result
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::RawConfig;

    fn unreachable_cache() -> TokenCache {
        let config = BridgeConfig::try_from(RawConfig {
            remote_url: "http://127.0.0.1:9/mcp".into(),
            token_url: "http://127.0.0.1:9/token".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            scope: None,
            remote_timeout: Duration::from_secs(1),
            token_timeout: Duration::from_secs(1),
        })
        .unwrap();
        TokenCache::new(&config, reqwest::Client::new())
    }

    #[test]
    fn invalidate_on_empty_cache_is_a_no_op() {
        let cache = unreachable_cache();
        cache.invalidate_token();
        cache.invalidate_token();
        assert!(cache.cached().is_none());
    }

    #[tokio::test]
    async fn failed_refresh_clears_marker_and_keeps_cache() {
        let cache = unreachable_cache();
        assert!(cache.refresh_token().await.is_err());
        assert!(cache.cached().is_none());
        assert!(lock(&cache.state).in_flight.is_none());

        // A later refresh starts a new exchange rather than replaying the old result.
        assert!(cache.refresh_token().await.is_err());
        assert_eq!(lock(&cache.state).generation, 2);
    }
}
