//! Client configuration
//!
//! [`GateSettings`] is the raw, deserializable form (environment variables,
//! `.env` files, config files). [`ClientConfig`] is the validated form the
//! middleware runs on; it is built once at startup and shared read-only.

use crate::error::{GateError, GateResult};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_with::DeserializeFromStr;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Path the provider redirects back to, relative to the application URL
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Minimum length of the session signing secret in bytes
pub const MIN_SESSION_SECRET_LEN: usize = 32;

const DEFAULT_RESPONSE_TYPE: &str = "code";
const DEFAULT_SCOPE: &str = "openid profile";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// What the gate does with a stored token whose `expiry` has passed
///
/// Parsed case-insensitively through [`FromStr`], from both environment
/// variables and config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, DeserializeFromStr)]
pub enum TokenExpiryPolicy {
    /// Let the request through regardless of expiry
    #[default]
    Ignore,
    /// Treat the session as unauthenticated and restart the flow
    Reauthenticate,
    /// Use the refresh token if one is stored, otherwise restart the flow
    Refresh,
}

impl FromStr for TokenExpiryPolicy {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "reauthenticate" => Ok(Self::Reauthenticate),
            "refresh" => Ok(Self::Refresh),
            other => Err(GateError::configuration_with_key(
                format!("unknown token expiry policy '{other}'"),
                "TOKEN_EXPIRY_POLICY",
            )),
        }
    }
}

impl fmt::Display for TokenExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ignore => "ignore",
            Self::Reauthenticate => "reauthenticate",
            Self::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// Raw settings as read from the environment or a config file
///
/// Field names are the lowercase forms of the environment variables
/// (`DISCOVERY_URL` becomes `discovery_url`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub discovery_url: String,
    pub logout_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub app_url: String,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub session_secret: String,
    pub http_timeout_secs: Option<u64>,
    pub session_idle_timeout_secs: Option<u64>,
    pub verify_state: Option<bool>,
    pub token_expiry_policy: Option<TokenExpiryPolicy>,
}

/// Validated relying-party configuration
#[derive(Clone)]
pub struct ClientConfig {
    pub discovery_url: Url,
    pub logout_url: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    /// Application base URL without a trailing slash
    pub app_url: String,
    /// `<app_url>/auth/callback`
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub session_secret: SecretString,
    pub http_timeout: Duration,
    pub session_idle_timeout: Option<Duration>,
    pub verify_state: bool,
    pub token_expiry_policy: TokenExpiryPolicy,
}

impl ClientConfig {
    /// Validate raw settings into a usable configuration
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] naming the offending key when a
    /// required value is empty, a URL does not parse, or the session secret
    /// is shorter than [`MIN_SESSION_SECRET_LEN`] bytes.
    pub fn from_settings(settings: GateSettings) -> GateResult<Self> {
        let discovery_url = parse_url(&settings.discovery_url, "DISCOVERY_URL")?;
        let app_url = parse_url(&settings.app_url, "APP_URL")?;
        let logout_url = required(settings.logout_url, "LOGOUT_URL")?;
        parse_url(&logout_url, "LOGOUT_URL")?;
        let client_id = required(settings.client_id, "CLIENT_ID")?;

        if settings.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(GateError::configuration_with_key(
                format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
                "SESSION_SECRET",
            ));
        }

        let app_url = app_url.as_str().trim_end_matches('/').to_string();
        let redirect_uri = format!("{app_url}{CALLBACK_PATH}");

        let client_secret = settings
            .client_secret
            .filter(|secret| !secret.is_empty())
            .map(SecretString::from);

        Ok(Self {
            discovery_url,
            logout_url,
            client_id,
            client_secret,
            app_url,
            redirect_uri,
            response_type: non_empty_or(settings.response_type, DEFAULT_RESPONSE_TYPE),
            scope: non_empty_or(settings.scope, DEFAULT_SCOPE),
            session_secret: SecretString::from(settings.session_secret),
            http_timeout: Duration::from_secs(
                settings
                    .http_timeout_secs
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            session_idle_timeout: settings.session_idle_timeout_secs.map(Duration::from_secs),
            verify_state: settings.verify_state.unwrap_or(true),
            token_expiry_policy: settings.token_expiry_policy.unwrap_or_default(),
        })
    }

    /// Whether session cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.app_url.starts_with("https://")
    }

    /// Client secret, if the client is confidential
    pub(crate) fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_ref().map(|secret| secret.expose_secret())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("discovery_url", &self.discovery_url.as_str())
            .field("logout_url", &self.logout_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("response_type", &self.response_type)
            .field("scope", &self.scope)
            .field("http_timeout", &self.http_timeout)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("verify_state", &self.verify_state)
            .field("token_expiry_policy", &self.token_expiry_policy)
            .finish_non_exhaustive()
    }
}

fn required(value: String, key: &str) -> GateResult<String> {
    if value.trim().is_empty() {
        return Err(GateError::configuration_with_key("is required", key));
    }
    Ok(value)
}

fn parse_url(value: &str, key: &str) -> GateResult<Url> {
    if value.trim().is_empty() {
        return Err(GateError::configuration_with_key("is required", key));
    }
    Url::parse(value)
        .map_err(|e| GateError::configuration_with_key(format!("invalid URL: {e}"), key))
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
