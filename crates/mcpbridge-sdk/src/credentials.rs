//! The cached bearer credential.

use std::fmt;
use std::time::{Duration, Instant};

/// How long before its stated expiry a credential stops being handed out.
pub const EXPIRY_BUFFER: Duration = Duration::from_secs(30);

/// A bearer token obtained from the token endpoint.
///
/// * `access_token` – the opaque token presented to the remote.
/// * `token_type`   – the scheme reported by the endpoint, `Bearer` by default.
/// * `expires_at`   – absolute expiry; `None` means the token is only
///   replaced when the remote rejects it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    token_type: String,
    expires_at: Option<Instant>,
}

impl Credential {
    /// Build a credential issued at `issued_at` that lives for `expires_in`.
    ///
    /// A lifetime reaching past the representable range of [`Instant`]
    /// yields a credential without expiry.
    pub fn issued(
        access_token: impl Into<String>,
        token_type: Option<String>,
        expires_in: Option<Duration>,
        issued_at: Instant,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: expires_in.and_then(|lifetime| issued_at.checked_add(lifetime)),
        }
    }

    /// The token string.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The token scheme.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Absolute expiry, if the endpoint reported one.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Whether the credential may still be used at `now`.
    ///
    /// A credential stops being usable [`EXPIRY_BUFFER`] before `expires_at`.
    pub fn is_usable_at(&self, now: Instant) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => now + EXPIRY_BUFFER < expires_at,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &fingerprint(&self.access_token))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Short, log-safe stand-in for a token.
pub fn fingerprint(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}… (len {})", token.len())
}
