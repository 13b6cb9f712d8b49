//! Protected home page
//!
//! Calls the userinfo endpoint with the session's access token and renders
//! the returned claims. Provider failures are shown to the user (sanitized)
//! and not retried.

use crate::error::{GateError, GateResult};
use crate::provider::UserInfo;
use crate::session::FlowSession;
use crate::state::GateState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use handlebars::Handlebars;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tower_sessions::Session;

const PROFILE_TEMPLATE: &str = "profile";

/// Claims handed to the template
#[derive(Debug, Serialize)]
struct ProfileContext<'a> {
    name: &'a str,
    nickname: &'a str,
    picture: Option<&'a str>,
}

/// HTML renderer for [`UserInfo`]
///
/// Every value is HTML-escaped; pictures are only linked for `http(s)` URLs.
#[derive(Clone)]
pub struct ProfileRenderer {
    handlebars: Arc<Handlebars<'static>>,
}

impl ProfileRenderer {
    /// Create a renderer with the embedded template registered
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the template fails to parse.
    pub fn new() -> GateResult<Self> {
        let mut hb = Handlebars::new();
        hb.register_template_string(PROFILE_TEMPLATE, include_str!("templates/profile.html.hbs"))
            .map_err(|e| {
                GateError::configuration(format!("Failed to register profile template: {e}"))
            })?;

        Ok(Self {
            handlebars: Arc::new(hb),
        })
    }

    /// Render the profile page
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if rendering fails.
    pub fn render(&self, user: &UserInfo) -> GateResult<String> {
        let picture = user
            .picture
            .as_deref()
            .filter(|p| p.starts_with("https://") || p.starts_with("http://"));

        let context = ProfileContext {
            name: user.name.as_deref().unwrap_or_default(),
            nickname: user.nickname.as_deref().unwrap_or_default(),
            picture,
        };

        self.handlebars
            .render(PROFILE_TEMPLATE, &context)
            .map_err(|e| GateError::configuration(format!("Failed to render profile: {e}")))
    }
}

impl fmt::Debug for ProfileRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRenderer").finish_non_exhaustive()
    }
}

/// `GET /` behind the gate
pub async fn home(State(state): State<GateState>, session: Session) -> Response {
    match render_home(&state, &FlowSession::new(session)).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn render_home(state: &GateState, flow: &FlowSession) -> GateResult<String> {
    // The gate only lets requests with a token through; a concurrent logout
    // can still remove it in between.
    let token = flow
        .token()
        .await?
        .ok_or_else(|| GateError::upstream("userinfo", "session has no token"))?;

    let metadata = state.metadata.wait().await?;
    let user = state.provider.userinfo(&metadata, &token).await?;
    state.profile.render(&user)
}
