//! Authorization callback (`/auth/callback`)
//!
//! Completes the flow started by the gate: the pending verifier, state and
//! nonce are consumed from the session, the code is exchanged at the token
//! endpoint, and the browser is sent back to the page it originally asked for.

use crate::error::{GateError, GateResult};
use crate::gate::found;
use crate::session::FlowSession;
use crate::state::GateState;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

/// Query parameters the provider redirects back with
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /auth/callback`
///
/// Redirects (302) to the stored target URL on success. Every failure is
/// answered with `ERROR: <message>`; the code exchange is never retried.
pub async fn handle_callback(
    State(state): State<GateState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Response {
    match complete_flow(&state, &FlowSession::new(session), params).await {
        Ok(target) => found(&target),
        Err(e) => e.into_callback_response(),
    }
}

async fn complete_flow(
    state: &GateState,
    flow: &FlowSession,
    params: CallbackParams,
) -> GateResult<String> {
    let pending = flow.take_pending_flow().await?;

    if let Some(error) = params.error {
        let detail = params
            .error_description
            .map(|d| format!("{error}: {d}"))
            .unwrap_or(error);
        return Err(GateError::callback_rejected(format!(
            "provider returned error {detail}"
        )));
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| GateError::callback_rejected("missing authorization code"))?;

    if state.config.verify_state {
        match (pending.state.as_deref(), params.state.as_deref()) {
            (Some(expected), Some(received)) if expected == received => {}
            (None, _) => {
                return Err(GateError::callback_rejected("no authorization request pending"));
            }
            _ => return Err(GateError::callback_rejected("state mismatch")),
        }
    }

    if pending.verifier.is_none() {
        warn!("No PKCE verifier in session; exchanging code without code_verifier");
    }

    let metadata = state.metadata.wait().await?;
    let token = state
        .provider
        .exchange_code(&metadata, &code, pending.verifier.as_deref())
        .await?;

    flow.store_token(&token).await?;
    let target = flow
        .take_target_url()
        .await?
        .filter(|target| is_local_path(target))
        .unwrap_or_else(|| "/".to_string());
    flow.rotate_id().await?;

    info!("Authentication completed, redirecting to {}", target);
    Ok(target)
}

/// Same-origin absolute path (`/x`, not `//host` or `/\host`)
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}
