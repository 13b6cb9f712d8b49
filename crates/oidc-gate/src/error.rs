//! Error types for oidc-gate
//!
//! Every failure surfaced by the middleware falls into one of a small set of
//! kinds. The full error (including upstream detail) is logged server-side;
//! callers of the HTTP surface only ever see [`GateError::sanitize`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type for gate operations
pub type GateResult<T> = std::result::Result<T, GateError>;

/// Coarse classification of a [`GateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Discovery document could not be fetched or parsed
    MetadataFetch,
    /// The token endpoint rejected or failed the exchange
    TokenExchange,
    /// The callback request itself was unusable
    CallbackRejected,
    /// Userinfo or another provider call failed
    Upstream,
    /// Missing or invalid configuration
    Configuration,
    /// The session store failed
    Session,
}

/// Main error type for oidc-gate
///
/// Variants carry plain strings so the error is `Clone` and can be shared
/// between every waiter of the provider metadata future.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GateError {
    /// Discovery document fetch or parse failure
    #[error("Metadata fetch error: {message}")]
    MetadataFetch { message: String },

    /// Code or refresh token exchange failure
    #[error("Token exchange error: {message}")]
    TokenExchange {
        message: String,
        status_code: Option<u16>,
    },

    /// Callback rejected before contacting the provider
    ///
    /// Raised for a provider-reported `error` parameter, a missing `code`,
    /// or a `state` that does not match the pending flow.
    #[error("Callback rejected: {message}")]
    CallbackRejected { message: String },

    /// Failure of a provider call other than the token exchange
    #[error("Upstream error ({operation}): {message}")]
    Upstream { operation: String, message: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },

    /// Session store failure
    #[error("Session error: {message}")]
    Session { message: String },
}

impl GateError {
    /// Create a metadata fetch error
    pub fn metadata_fetch(message: impl Into<String>) -> Self {
        Self::MetadataFetch {
            message: message.into(),
        }
    }

    /// Create a token exchange error
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::TokenExchange {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a token exchange error carrying the provider's HTTP status
    pub fn token_exchange_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::TokenExchange {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a callback rejection
    pub fn callback_rejected(message: impl Into<String>) -> Self {
        Self::CallbackRejected {
            message: message.into(),
        }
    }

    /// Create an upstream error for the named provider operation
    pub fn upstream(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error naming the offending key
    pub fn configuration_with_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a session store error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MetadataFetch { .. } => ErrorKind::MetadataFetch,
            Self::TokenExchange { .. } => ErrorKind::TokenExchange,
            Self::CallbackRejected { .. } => ErrorKind::CallbackRejected,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Session { .. } => ErrorKind::Session,
        }
    }

    /// HTTP status used when this error terminates a request
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::MetadataFetch => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::TokenExchange | ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::CallbackRejected => StatusCode::BAD_REQUEST,
            ErrorKind::Configuration | ErrorKind::Session => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Sanitize error message for client responses
    ///
    /// Removes internal details to prevent information disclosure.
    pub fn sanitize(&self) -> String {
        match self {
            Self::MetadataFetch { .. } => "Identity provider is unavailable".to_string(),
            Self::TokenExchange { .. } => "Token exchange failed".to_string(),
            Self::CallbackRejected { .. } => "Invalid authorization response".to_string(),
            Self::Upstream { .. } => "Identity provider request failed".to_string(),
            Self::Configuration { .. } => "Server misconfigured".to_string(),
            Self::Session { .. } => "Session unavailable".to_string(),
        }
    }

    /// Response used by the callback endpoint: `ERROR: <sanitized message>`
    pub fn into_callback_response(self) -> Response {
        tracing::error!(error = %self, "Authorization callback failed");
        (self.status_code(), format!("ERROR: {}", self.sanitize())).into_response()
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (self.status_code(), self.sanitize()).into_response()
    }
}

impl From<tower_sessions::session::Error> for GateError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::session(err.to_string())
    }
}
