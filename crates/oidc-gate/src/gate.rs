//! Authentication gate middleware
//!
//! Applied in front of protected routes with
//! [`axum::middleware::from_fn_with_state`]. A session holding a token record
//! passes through. Any other request starts an Authorization Code + PKCE
//! flow: the requested path, a fresh verifier, `state` and `nonce` are
//! written to the session and the browser is redirected to the provider.

use crate::config::{ClientConfig, TokenExpiryPolicy};
use crate::error::GateResult;
use crate::pkce::{self, CHALLENGE_METHOD, STATE_LENGTH};
use crate::provider::{TokenRecord, now_millis};
use crate::session::FlowSession;
use crate::state::GateState;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;
use tracing::{debug, info, warn};

/// Build the provider authorization URL
///
/// Parameters are appended in a fixed order and percent-encoded; an
/// endpoint that already carries a query string is extended with `&`.
pub fn build_authorization_url(
    authorization_endpoint: &str,
    config: &ClientConfig,
    state: &str,
    nonce: &str,
    code_challenge: &str,
) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", config.scope.as_str()),
        ("response_type", config.response_type.as_str()),
        ("state", state),
        ("nonce", nonce),
        ("code_challenge", code_challenge),
        ("code_challenge_method", CHALLENGE_METHOD),
    ];

    let query = params
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if authorization_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{authorization_endpoint}{separator}{query}")
}

/// 302 redirect to `location`
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Middleware requiring an authenticated session
///
/// Errors terminate the request with the sanitized message of the failing
/// [`crate::GateError`].
pub async fn require_authentication(
    State(state): State<GateState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let flow = FlowSession::new(session);

    match authorize(&state, &flow).await {
        Ok(true) => next.run(request).await,
        Ok(false) => match start_flow(&state, &flow, request.uri()).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        },
        Err(e) => e.into_response(),
    }
}

/// Whether the session may reach the protected handler
async fn authorize(state: &GateState, flow: &FlowSession) -> GateResult<bool> {
    let Some(token) = flow.token().await? else {
        return Ok(false);
    };

    let policy = state.config.token_expiry_policy;
    if policy == TokenExpiryPolicy::Ignore || !token.is_expired(now_millis()) {
        return Ok(true);
    }

    match policy {
        TokenExpiryPolicy::Refresh => Ok(refresh(state, flow, &token).await),
        _ => {
            debug!("Stored token expired, re-authenticating");
            Ok(false)
        }
    }
}

/// Try to replace an expired token; `false` sends the user through login again
async fn refresh(state: &GateState, flow: &FlowSession, token: &TokenRecord) -> bool {
    let Some(refresh_token) = token.refresh_token.as_deref() else {
        debug!("Stored token expired without refresh token, re-authenticating");
        return false;
    };

    let result = async {
        let metadata = state.metadata.wait().await?;
        let refreshed = state.provider.refresh(&metadata, refresh_token).await?;
        flow.store_token(&refreshed).await
    }
    .await;

    match result {
        Ok(()) => {
            info!("Access token refreshed");
            true
        }
        Err(e) => {
            warn!("Token refresh failed, re-authenticating: {}", e);
            false
        }
    }
}

async fn start_flow(state: &GateState, flow: &FlowSession, uri: &Uri) -> GateResult<Response> {
    let target_url = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let verifier = pkce::generate_verifier();
    let oidc_state = pkce::random_string(STATE_LENGTH);
    let nonce = pkce::random_string(STATE_LENGTH);

    flow.begin_flow(target_url, &verifier, &oidc_state, &nonce)
        .await?;

    let challenge = pkce::derive_challenge(&verifier);
    let metadata = state.metadata.wait().await?;
    let location = build_authorization_url(
        &metadata.authorization_endpoint,
        &state.config,
        &oidc_state,
        &nonce,
        &challenge,
    );

    debug!("Redirecting unauthenticated request for {} to provider", target_url);
    Ok(found(&location))
}
