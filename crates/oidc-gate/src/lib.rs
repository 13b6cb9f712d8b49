//! # oidc-gate
//!
//! OpenID Connect relying-party middleware for axum implementing the
//! Authorization Code flow with PKCE (RFC 7636, `S256`).
//!
//! ## Flow
//!
//! 1. An unauthenticated request to a protected route is redirected to the
//!    provider's authorization endpoint. The requested path, a 100-character
//!    code verifier, `state` and `nonce` are kept in the server-side session.
//! 2. The provider redirects back to `/auth/callback?code=...`. The code and
//!    verifier are exchanged at the token endpoint and the resulting
//!    [`TokenRecord`] (with a locally computed `expiry`) is stored in the
//!    session.
//! 3. The browser returns to the page it originally asked for.
//! 4. `/logout` revokes the access and refresh tokens (RFC 7009,
//!    best-effort), destroys the session and optionally redirects to the
//!    provider's logout URL (`?slo=1`).
//!
//! Provider metadata is discovered once at startup. Requests that need it
//! before discovery finishes wait for it; see [`ProviderMetadataHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oidc_gate::{ClientConfig, GateSettings, GateState, gate_router};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_settings(GateSettings {
//!     discovery_url: "https://idp.example.com/.well-known/openid-configuration".into(),
//!     logout_url: "https://idp.example.com/logout".into(),
//!     client_id: "my-client".into(),
//!     app_url: "http://localhost:3000".into(),
//!     session_secret: "change-me-to-at-least-32-random-bytes".into(),
//!     ..GateSettings::default()
//! })?;
//!
//! let app = gate_router(GateState::new(config)?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Not provided
//!
//! ID tokens are stored but their signatures and claims are not verified.

pub mod callback;
pub mod config;
pub mod error;
pub mod gate;
pub mod health;
pub mod logout;
pub mod metadata;
pub mod pkce;
pub mod profile;
pub mod provider;
pub mod router;
pub mod session;
pub mod state;

pub use config::{CALLBACK_PATH, ClientConfig, GateSettings, TokenExpiryPolicy};
pub use error::{ErrorKind, GateError, GateResult};
pub use gate::{build_authorization_url, require_authentication};
pub use metadata::{MetadataStatus, ProviderMetadata, ProviderMetadataHandle, resolve_metadata};
pub use pkce::{derive_challenge, random_string};
pub use provider::{ProviderClient, TokenRecord, UserInfo};
pub use router::{SESSION_COOKIE_NAME, gate_router, gate_router_with_store};
pub use session::{FlowSession, PendingFlow};
pub use state::GateState;
