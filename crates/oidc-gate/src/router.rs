//! Router assembly
//!
//! | route | auth | handler |
//! |---|---|---|
//! | `GET /` | yes | [`crate::profile::home`] |
//! | `GET /auth/callback` | no | [`crate::callback::handle_callback`] |
//! | `GET /logout` | no | [`crate::logout::handle_logout`] |
//! | `GET /health` | no | [`crate::health::health_handler`] |

use crate::callback::handle_callback;
use crate::config::{CALLBACK_PATH, ClientConfig};
use crate::gate::require_authentication;
use crate::health::health_handler;
use crate::logout::handle_logout;
use crate::profile::home;
use crate::state::GateState;
use axum::body::Body;
use axum::http::Request;
use axum::{Router, middleware, routing::get};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tracing::Span;

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "oidc_gate_session";

/// Router with an in-memory session store
pub fn gate_router(state: GateState) -> Router {
    gate_router_with_store(state, MemoryStore::default())
}

/// Router backed by the given session store
pub fn gate_router_with_store<S>(state: GateState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config.clone();

    Router::new()
        .route("/", get(home))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_authentication,
        ))
        .route(CALLBACK_PATH, get(handle_callback))
        .route("/logout", get(handle_logout))
        .route("/health", get(health_handler))
        .layer(
            SessionManagerLayer::new(store)
                .with_name(SESSION_COOKIE_NAME)
                .with_same_site(SameSite::Lax)
                .with_secure(config.secure_cookies())
                .with_expiry(session_expiry(&config))
                .with_signed(signing_key(&config)),
        )
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Request span carrying the path only
///
/// The query string holds the authorization code and `state` on callbacks,
/// so the full URI is never recorded.
fn request_span(request: &Request<Body>) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// 64-byte cookie signing key derived from the session secret
fn signing_key(config: &ClientConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

fn session_expiry(config: &ClientConfig) -> Expiry {
    match config.session_idle_timeout {
        Some(idle) => Expiry::OnInactivity(
            time::Duration::try_from(idle).unwrap_or(time::Duration::MAX),
        ),
        None => Expiry::OnSessionEnd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_span_omits_query() {
        let request = Request::builder()
            .uri("/auth/callback?code=secret-code&state=secret-state")
            .body(Body::empty())
            .unwrap();

        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let span = request_span(&request);
            let fields: Vec<&str> = span
                .metadata()
                .unwrap()
                .fields()
                .iter()
                .map(|f| f.name())
                .collect();

            assert_eq!(fields, vec!["method", "path"]);
        });
    }
}
