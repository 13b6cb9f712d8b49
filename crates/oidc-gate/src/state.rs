//! Shared application state

use crate::config::ClientConfig;
use crate::error::GateResult;
use crate::metadata::ProviderMetadataHandle;
use crate::profile::ProfileRenderer;
use crate::provider::ProviderClient;
use std::sync::Arc;

/// State shared by the gate middleware and every handler
///
/// Everything here is immutable once built; cloning is cheap.
#[derive(Clone, Debug)]
pub struct GateState {
    pub config: Arc<ClientConfig>,
    pub provider: ProviderClient,
    pub metadata: ProviderMetadataHandle,
    pub profile: ProfileRenderer,
}

impl GateState {
    /// Build the state and start provider discovery in the background
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Configuration`] if the HTTP client or the
    /// profile template cannot be created.
    pub fn new(config: ClientConfig) -> GateResult<Self> {
        let config = Arc::new(config);
        let provider = ProviderClient::new(Arc::clone(&config))?;
        let metadata =
            ProviderMetadataHandle::spawn(provider.http().clone(), config.discovery_url.clone());
        Ok(Self {
            profile: ProfileRenderer::new()?,
            config,
            provider,
            metadata,
        })
    }

    /// Build the state around an existing metadata handle
    ///
    /// # Errors
    ///
    /// Returns [`crate::GateError::Configuration`] if the HTTP client or the
    /// profile template cannot be created.
    pub fn with_metadata(config: ClientConfig, metadata: ProviderMetadataHandle) -> GateResult<Self> {
        let config = Arc::new(config);
        Ok(Self {
            provider: ProviderClient::new(Arc::clone(&config))?,
            profile: ProfileRenderer::new()?,
            config,
            metadata,
        })
    }
}
