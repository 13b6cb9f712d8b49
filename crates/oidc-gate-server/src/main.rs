//! oidc-gate entry point
//!
//! Serves a single protected home page behind the OpenID Connect gate.

mod cli;
mod logging;
mod settings;

use anyhow::Context;
use clap::Parser;
use oidc_gate::{ClientConfig, GateState, gate_router};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.log_level, cli.log_format)?;

    let settings = settings::load(cli.config.as_deref())?;
    let config = ClientConfig::from_settings(settings).context("invalid client configuration")?;
    info!("Starting oidc-gate with {:?}", config);

    let state = GateState::new(config)?;
    let app = gate_router(state);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
