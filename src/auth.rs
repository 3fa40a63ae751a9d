/// Bearer-token credential cache for the upstream OAuth endpoint.
///
/// The upstream hands out short-lived access tokens in exchange for a
/// client-id/secret pair. This module owns the single mutable credential and
/// refreshes it on demand. A refused refresh is logged and left in place:
/// the data fetch then runs with a stale or empty token and the upstream's
/// rejection surfaces to the caller undisguised.
///
/// # Clock injection
/// Expiry checks accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, which keeps expiry behavior deterministic in
/// tests. Thin `*_at`-less wrappers use the real clock.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::Credentials;
use crate::logging;
use crate::model::AdapterError;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// The cached bearer credential. Owned exclusively by `TokenCache`; starts
/// empty and is mutated only by a successful refresh. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credential {
    /// Full header value, "Bearer <token>". Empty until the first refresh.
    pub bearer_token: String,
    /// Instant after which the token is no longer valid.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// A credential is expired if its expiry is absent or not after `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }

    /// Convenience wrapper using the real clock. Use `is_expired_at` in
    /// tests to keep them deterministic.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Token exchange response
// ---------------------------------------------------------------------------

/// Success body of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Time-to-live in seconds.
    expires_in: u64,
}

// ---------------------------------------------------------------------------
// TokenCache
// ---------------------------------------------------------------------------

pub struct TokenCache {
    oauth_url: String,
    credentials: Credentials,
    credential: Credential,
}

impl TokenCache {
    pub fn new(oauth_url: String, credentials: Credentials) -> Self {
        TokenCache {
            oauth_url,
            credentials,
            credential: Credential::default(),
        }
    }

    /// Read access to the current credential without triggering a refresh.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Ensure the cached credential is valid at `now`, refreshing it through
    /// the token endpoint if necessary.
    ///
    /// A failed refresh is logged and swallowed: the stale/empty credential
    /// is returned so the subsequent fetch can proceed and surface the
    /// upstream's own rejection. The exclusive `&mut self` receiver makes
    /// the check-then-refresh sequence atomic under the one-request-in-flight
    /// model; concurrent callers would need a mutex around the whole cache.
    pub fn ensure_valid_at(
        &mut self,
        client: &reqwest::blocking::Client,
        now: DateTime<Utc>,
    ) -> &Credential {
        if self.credential.is_expired_at(now) {
            if let Err(e) = self.refresh_at(client, now) {
                logging::log_auth_failure("token refresh", &e);
            }
        }
        &self.credential
    }

    /// Convenience wrapper using the real clock.
    pub fn ensure_valid(&mut self, client: &reqwest::blocking::Client) -> &Credential {
        self.ensure_valid_at(client, Utc::now())
    }

    /// Exchange client credentials for a fresh access token.
    ///
    /// POST {oauth_url} with the static API key header and a form body of
    /// clientId/clientSecret; success is `{access_token, expires_in}`.
    fn refresh_at(
        &mut self,
        client: &reqwest::blocking::Client,
        now: DateTime<Utc>,
    ) -> Result<(), AdapterError> {
        let response = client
            .post(&self.oauth_url)
            .header("x-api-key", &self.credentials.api_key)
            .form(&[
                ("clientId", self.credentials.client_id.as_str()),
                ("clientSecret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .map_err(|e| AdapterError::Auth(format!("token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AdapterError::Auth(format!(
                "token endpoint returned {}",
                response.status().as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AdapterError::Auth(format!("token response not decodable: {}", e)))?;

        self.credential.bearer_token = format!("Bearer {}", token.access_token);
        self.credential.expires_at = Some(now + Duration::seconds(token.expires_in as i64));

        logging::debug(
            logging::Source::Auth,
            None,
            &format!("token refreshed, ttl {}s", token.expires_in),
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
