//! # Provider Metadata
//!
//! Fetches the OpenID Connect discovery document once at startup and exposes
//! the result as a shared completion future. Every request path that needs
//! an endpoint awaits the same [`ProviderMetadataHandle`]; requests that
//! arrive before discovery finishes simply wait, and a failed discovery is a
//! stored error every waiter observes instead of a future that never resolves.

use crate::error::{GateError, GateResult};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// Endpoints published by the identity provider
///
/// The four endpoints are required; discovery documents lacking any of them
/// are rejected. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier, when published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Where the browser is sent to log in
    pub authorization_endpoint: String,

    /// Where authorization codes are exchanged for tokens
    pub token_endpoint: String,

    /// Where access tokens are exchanged for user claims
    pub userinfo_endpoint: String,

    /// RFC 7009 revocation endpoint
    pub revocation_endpoint: String,

    /// RP-initiated logout endpoint, when published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
}

impl ProviderMetadata {
    fn validate(&self) -> GateResult<()> {
        let endpoints = [
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("userinfo_endpoint", &self.userinfo_endpoint),
            ("revocation_endpoint", &self.revocation_endpoint),
        ];

        for (name, value) in endpoints {
            if value.trim().is_empty() {
                return Err(GateError::metadata_fetch(format!(
                    "discovery document has empty {name}"
                )));
            }
            Url::parse(value).map_err(|e| {
                GateError::metadata_fetch(format!("discovery document has invalid {name}: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Fetch and parse the discovery document at `discovery_url`
///
/// Performs a single attempt; there is no retry.
///
/// # Errors
///
/// Returns [`GateError::MetadataFetch`] if the request fails, the provider
/// answers with a non-success status, the body is not JSON, or a required
/// endpoint is missing.
pub async fn resolve_metadata(
    http: &reqwest::Client,
    discovery_url: &Url,
) -> GateResult<ProviderMetadata> {
    debug!("Fetching discovery document: {}", discovery_url);

    let response = http
        .get(discovery_url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| GateError::metadata_fetch(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(GateError::metadata_fetch(format!(
            "discovery endpoint returned {status}"
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| GateError::metadata_fetch(format!("invalid discovery document: {e}")))?;

    metadata.validate()?;
    Ok(metadata)
}

/// Observable state of the metadata future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataStatus {
    Pending,
    Ready,
    Failed,
}

impl MetadataStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type MetadataFuture = Shared<BoxFuture<'static, GateResult<Arc<ProviderMetadata>>>>;

/// One-shot, cloneable completion handle for the provider metadata
#[derive(Clone)]
pub struct ProviderMetadataHandle {
    inner: MetadataFuture,
}

impl ProviderMetadataHandle {
    /// Start resolving metadata in the background
    ///
    /// Must be called from within a Tokio runtime. The fetch is driven to
    /// completion whether or not anyone is waiting on it yet.
    pub fn spawn(http: reqwest::Client, discovery_url: Url) -> Self {
        let future = async move {
            match resolve_metadata(&http, &discovery_url).await {
                Ok(metadata) => {
                    info!(
                        "Provider metadata ready (authorization: {}, token: {})",
                        metadata.authorization_endpoint, metadata.token_endpoint
                    );
                    Ok(Arc::new(metadata))
                }
                Err(e) => {
                    error!("Provider metadata unavailable: {}", e);
                    Err(e)
                }
            }
        }
        .boxed()
        .shared();

        tokio::spawn(future.clone());
        Self { inner: future }
    }

    /// Handle that is already resolved with `metadata`
    pub fn ready(metadata: ProviderMetadata) -> Self {
        Self {
            inner: futures::future::ready(Ok(Arc::new(metadata)))
                .boxed()
                .shared(),
        }
    }

    /// Handle that is already resolved with `error`
    pub fn failed(error: GateError) -> Self {
        Self {
            inner: futures::future::ready(Err(error)).boxed().shared(),
        }
    }

    /// Wait for the metadata
    ///
    /// # Errors
    ///
    /// Returns the stored [`GateError::MetadataFetch`] if discovery failed.
    pub async fn wait(&self) -> GateResult<Arc<ProviderMetadata>> {
        self.inner.clone().await
    }

    /// Current state without waiting
    pub fn status(&self) -> MetadataStatus {
        match self.inner.clone().now_or_never() {
            None => MetadataStatus::Pending,
            Some(Ok(_)) => MetadataStatus::Ready,
            Some(Err(_)) => MetadataStatus::Failed,
        }
    }
}

impl fmt::Debug for ProviderMetadataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderMetadataHandle")
            .field("status", &self.status())
            .finish()
    }
}
