//! Identity provider client
//!
//! Back-channel calls from the relying party to the provider: authorization
//! code exchange, refresh, RFC 7009 revocation and the userinfo endpoint.
//! Requests are plain `application/x-www-form-urlencoded` posts carrying the
//! client credentials in the body.

use crate::config::ClientConfig;
use crate::error::{GateError, GateResult};
use crate::metadata::ProviderMetadata;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// `expires_in` as a JSON number or a numeric string (`"3599"`)
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lifetime {
        Seconds(u64),
        Text(String),
    }

    match Option::<Lifetime>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lifetime::Seconds(secs)) => Ok(Some(secs)),
        Some(Lifetime::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid expires_in '{text}'"))),
    }
}

/// Token endpoint response as stored in the session
///
/// `expiry` is not sent by the provider; it is computed when the record is
/// received as epoch milliseconds `now + expires_in * 1000`. Fields the
/// provider sends that are not modelled here are kept in `extra`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(
        default,
        deserialize_with = "deserialize_expires_in",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenRecord {
    /// Stamp `expiry` relative to `now_ms`
    ///
    /// Without `expires_in` the record has no expiry.
    pub fn stamp_expiry(&mut self, now_ms: i64) {
        self.expiry = self.expires_in.map(|secs| {
            let millis = i64::try_from(secs)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000);
            now_ms.saturating_add(millis)
        });
    }

    /// Whether the record has a known expiry at or before `now_ms`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now_ms)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Claims returned by the userinfo endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Every other claim the provider returned
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

/// RFC 6749 section 5.2 error body
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Current time as epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Client for the provider's back-channel endpoints
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl ProviderClient {
    /// Create a client with redirects disabled and the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: Arc<ClientConfig>) -> GateResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.http_timeout)
            .user_agent(format!("oidc-gate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GateError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Underlying HTTP client, shared with discovery
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Exchange an authorization code for tokens
    ///
    /// `code_verifier` is omitted from the request when `verifier` is `None`;
    /// the provider then decides whether to accept the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::TokenExchange`] on transport failure, a non-success
    /// status, or an unparseable body.
    pub async fn exchange_code(
        &self,
        metadata: &ProviderMetadata,
        code: &str,
        verifier: Option<&str>,
    ) -> GateResult<TokenRecord> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(verifier) = verifier {
            params.push(("code_verifier", verifier));
        }
        if let Some(secret) = self.config.client_secret() {
            params.push(("client_secret", secret));
        }

        debug!("Exchanging authorization code at {}", metadata.token_endpoint);
        self.token_request(&metadata.token_endpoint, &params).await
    }

    /// Obtain a new token record with a refresh token
    ///
    /// If the provider does not rotate the refresh token, the one passed in
    /// is carried over to the new record.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::TokenExchange`] if the refresh is rejected.
    pub async fn refresh(
        &self,
        metadata: &ProviderMetadata,
        refresh_token: &str,
    ) -> GateResult<TokenRecord> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.client_secret() {
            params.push(("client_secret", secret));
        }

        debug!("Refreshing access token at {}", metadata.token_endpoint);
        let mut record = self.token_request(&metadata.token_endpoint, &params).await?;
        if record.refresh_token.is_none() {
            record.refresh_token = Some(refresh_token.to_string());
        }
        Ok(record)
    }

    async fn token_request(&self, endpoint: &str, params: &[(&str, &str)]) -> GateResult<TokenRecord> {
        let response = self
            .http
            .post(endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| GateError::token_exchange(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {status}"),
            };
            return Err(GateError::token_exchange_with_status(
                message,
                status.as_u16(),
            ));
        }

        let mut record: TokenRecord = response
            .json()
            .await
            .map_err(|e| GateError::token_exchange(format!("invalid token response: {e}")))?;
        record.stamp_expiry(now_millis());
        Ok(record)
    }

    /// Revoke a token (RFC 7009)
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Upstream`] on transport failure or a non-success
    /// status. Logout treats this as best-effort and does not propagate it.
    pub async fn revoke(&self, metadata: &ProviderMetadata, token: &str) -> GateResult<()> {
        let mut params: Vec<(&str, &str)> = vec![
            ("client_id", self.config.client_id.as_str()),
            ("token", token),
        ];
        if let Some(secret) = self.config.client_secret() {
            params.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(&metadata.revocation_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| GateError::upstream("revoke", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Revocation endpoint returned {}", status);
            return Err(GateError::upstream(
                "revoke",
                format!("revocation endpoint returned {status}"),
            ));
        }
        Ok(())
    }

    /// Fetch the user's claims with the access token as a bearer credential
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Upstream`] on transport failure, a non-success
    /// status, or a body that is not a JSON object.
    pub async fn userinfo(
        &self,
        metadata: &ProviderMetadata,
        token: &TokenRecord,
    ) -> GateResult<UserInfo> {
        let response = self
            .http
            .get(&metadata.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| GateError::upstream("userinfo", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GateError::upstream(
                "userinfo",
                format!("userinfo endpoint returned {status}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| GateError::upstream("userinfo", format!("invalid userinfo response: {e}")))
    }
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("client_id", &self.config.client_id)
            .finish_non_exhaustive()
    }
}
