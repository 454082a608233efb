//! OAuth client-credentials token acquisition for the Wiz API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::{Result, WizError};

const AUDIENCE: &str = "wiz-api";
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
/// Upper bound on the lifetime trusted from `expires_in`.
const MAX_EXPIRES_IN_SECS: u64 = 86_400;
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Source of bearer tokens for outbound GraphQL calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token that is valid for at least the skew window, fetching a
    /// new one when needed.
    async fn ensure_valid_token(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}

#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
}

/// Error body returned by the OAuth server.
#[derive(Deserialize, Default)]
struct AuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW < self.expires_at
    }
}

pub struct WizAuth {
    http: Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl WizAuth {
    pub fn new(http: Client, credentials: &Credentials) -> Self {
        Self {
            http,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            auth_url: credentials.auth_url.clone(),
            cached: Mutex::new(None),
        }
    }

    /// Perform one client-credentials exchange. No retry.
    pub async fn fetch_access_token(&self) -> Result<TokenResponse> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("audience", AUDIENCE),
        ];

        debug!(auth_url = %self.auth_url, "Requesting Wiz access token");

        let response = self
            .http
            .post(&self.auth_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Token request failed before a response was received");
                WizError::api_with_details(
                    "Network error while connecting to Wiz API",
                    json!({ "cause": e.to_string() }),
                )
            })?;

        Self::handle_auth_response(response).await
    }

    async fn handle_auth_response(response: reqwest::Response) -> Result<TokenResponse> {
        let status = response.status();

        if !status.is_success() {
            let fallback_message = format!("HTTP error {}", status.as_u16());
            let body: AuthErrorBody = response.json().await.unwrap_or_default();
            let detail = body
                .error_description
                .or(body.error)
                .unwrap_or(fallback_message);

            return Err(WizError::from_status(status.as_u16(), || {
                WizError::api_with_details(
                    format!("Authentication failed: {detail}"),
                    json!({ "status": status.as_u16() }),
                )
            }));
        }

        let raw: RawTokenResponse = response
            .json()
            .await
            .map_err(|_| WizError::api("Invalid token response from Wiz API"))?;

        match raw.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(TokenResponse {
                access_token,
                expires_in: raw.expires_in,
                token_type: raw.token_type,
            }),
            None => Err(WizError::api("Invalid token response from Wiz API")),
        }
    }

    /// Seed the cache with a token fetched elsewhere (at startup).
    pub async fn store(&self, token: &TokenResponse) {
        let mut cached = self.cached.lock().await;
        *cached = Some(Self::cache_entry(token, Instant::now()));
    }

    fn cache_entry(token: &TokenResponse, fetched_at: Instant) -> CachedToken {
        let expires_in = token
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .min(MAX_EXPIRES_IN_SECS);
        // An unrepresentable expiry is treated as already expired.
        let expires_at = fetched_at
            .checked_add(Duration::from_secs(expires_in))
            .unwrap_or(fetched_at);
        CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        }
    }
}

#[async_trait]
impl TokenProvider for WizAuth {
    async fn ensure_valid_token(&self) -> Result<String> {
        // Held across the refresh so concurrent callers share one fetch.
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.access_token.clone());
            }
            info!("Wiz access token expired or expiring, refreshing");
        }

        let fetched_at = Instant::now();
        let token = self.fetch_access_token().await?;
        let entry = Self::cache_entry(&token, fetched_at);
        let access_token = entry.access_token.clone();
        *cached = Some(entry);

        Ok(access_token)
    }
}

/// A fixed token, for callers that manage tokens themselves.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn ensure_valid_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
