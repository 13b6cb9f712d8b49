//! Typed access to the per-browser session
//!
//! The session store itself is `tower-sessions`; this module only decides
//! which keys exist and what lives under them:
//!
//! | key | value |
//! |---|---|
//! | `target_url` | path and query of the request that started the flow |
//! | `pkce_verifier` | code verifier of the pending flow |
//! | `oidc_state` | `state` sent with the pending authorization request |
//! | `oidc_nonce` | `nonce` sent with the pending authorization request |
//! | `token` | the [`TokenRecord`] once authenticated |

use crate::error::GateResult;
use crate::provider::TokenRecord;
use tower_sessions::Session;

const TARGET_URL_KEY: &str = "target_url";
const PKCE_VERIFIER_KEY: &str = "pkce_verifier";
const STATE_KEY: &str = "oidc_state";
const NONCE_KEY: &str = "oidc_nonce";
const TOKEN_KEY: &str = "token";

/// Values written when a flow starts and consumed by the callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingFlow {
    pub verifier: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
}

/// Session wrapper exposing only the keys the authorization flow uses
#[derive(Debug, Clone)]
pub struct FlowSession {
    session: Session,
}

impl FlowSession {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Stored token record, if the session is authenticated
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn token(&self) -> GateResult<Option<TokenRecord>> {
        Ok(self.session.get(TOKEN_KEY).await?)
    }

    /// Store (or replace) the token record
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn store_token(&self, token: &TokenRecord) -> GateResult<()> {
        self.session.insert(TOKEN_KEY, token).await?;
        Ok(())
    }

    /// Record a new pending flow, overwriting any earlier one
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn begin_flow(
        &self,
        target_url: &str,
        verifier: &str,
        state: &str,
        nonce: &str,
    ) -> GateResult<()> {
        self.session.insert(TARGET_URL_KEY, target_url).await?;
        self.session.insert(PKCE_VERIFIER_KEY, verifier).await?;
        self.session.insert(STATE_KEY, state).await?;
        self.session.insert(NONCE_KEY, nonce).await?;
        Ok(())
    }

    /// Remove and return the verifier, state and nonce of the pending flow
    ///
    /// Each value is single-use; a replayed callback finds nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn take_pending_flow(&self) -> GateResult<PendingFlow> {
        Ok(PendingFlow {
            verifier: self.session.remove(PKCE_VERIFIER_KEY).await?,
            state: self.session.remove(STATE_KEY).await?,
            nonce: self.session.remove(NONCE_KEY).await?,
        })
    }

    /// Remove and return the target URL
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn take_target_url(&self) -> GateResult<Option<String>> {
        Ok(self.session.remove(TARGET_URL_KEY).await?)
    }

    /// Issue a new session id, keeping the data
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn rotate_id(&self) -> GateResult<()> {
        self.session.cycle_id().await?;
        Ok(())
    }

    /// Delete the session and everything in it
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Session`] if the store fails.
    pub async fn destroy(&self) -> GateResult<()> {
        self.session.flush().await?;
        Ok(())
    }
}
