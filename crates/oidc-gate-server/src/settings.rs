//! Settings loading: optional config file, then environment variables

use anyhow::Context;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use oidc_gate::GateSettings;
use std::path::Path;

/// Load raw settings from `path` (if given) and the process environment
///
/// `.env` in the working directory is read into the environment first; a
/// missing `.env` is not an error.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or a value has the
/// wrong type.
pub fn load(path: Option<&Path>) -> anyhow::Result<GateSettings> {
    match dotenvy::dotenv() {
        Ok(file) => tracing::debug!("Loaded environment from {}", file.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("failed to read .env"),
    }

    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    build(builder.add_source(Environment::default().try_parsing(true)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<GateSettings> {
    builder
        .build()
        .context("failed to load configuration")?
        .try_deserialize()
        .context("invalid configuration")
}
