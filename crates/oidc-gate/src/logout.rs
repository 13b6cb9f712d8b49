//! Logout (`/logout`)
//!
//! Best-effort revocation of the stored tokens followed by session
//! destruction. Revocation failures are logged and never block logout.

use crate::gate::found;
use crate::metadata::ProviderMetadata;
use crate::provider::{ProviderClient, TokenRecord};
use crate::session::FlowSession;
use crate::state::GateState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, info, warn};

/// Query parameters accepted by `/logout`
#[derive(Debug, Default, Deserialize)]
pub struct LogoutParams {
    /// Request single logout at the provider as well
    pub slo: Option<String>,
}

impl LogoutParams {
    /// Any value other than empty, `0` or `false` requests single logout
    pub fn single_logout(&self) -> bool {
        self.slo
            .as_deref()
            .is_some_and(|v| !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false")))
    }
}

/// `GET /logout`
pub async fn handle_logout(
    State(state): State<GateState>,
    session: Session,
    Query(params): Query<LogoutParams>,
) -> Response {
    let flow = FlowSession::new(session);

    match flow.token().await {
        Ok(Some(token)) => match state.metadata.wait().await {
            Ok(metadata) => revoke_tokens(&state.provider, &metadata, &token).await,
            Err(e) => warn!("Skipping token revocation: {}", e),
        },
        Ok(None) => debug!("Logout without stored token"),
        Err(e) => warn!("Could not read token during logout: {}", e),
    }

    if let Err(e) = flow.destroy().await {
        return e.into_response();
    }
    info!("Session logged out");

    if params.single_logout() {
        found(&state.config.logout_url)
    } else {
        (StatusCode::OK, "Logged out").into_response()
    }
}

/// Revoke the access token, then the refresh token
///
/// The two attempts are independent; a failure of one does not skip the other.
pub async fn revoke_tokens(provider: &ProviderClient, metadata: &ProviderMetadata, token: &TokenRecord) {
    let tokens = [
        ("access_token", Some(token.access_token.as_str())),
        ("refresh_token", token.refresh_token.as_deref()),
    ];

    for (kind, value) in tokens {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        match provider.revoke(metadata, value).await {
            Ok(()) => debug!("Revoked {}", kind),
            Err(e) => warn!("Failed to revoke {}: {}", kind, e),
        }
    }
}
