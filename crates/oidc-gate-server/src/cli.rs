//! Command-line interface

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// OpenID Connect PKCE login demo
///
/// Client settings come from the environment (`DISCOVERY_URL`, `CLIENT_ID`,
/// `APP_URL`, ...), a `.env` file in the working directory, and optionally a
/// config file. Environment variables win over the file.
#[derive(Debug, Parser)]
#[command(name = "oidc-gate", version, about)]
pub struct Cli {
    /// Config file (TOML, YAML or JSON, by extension)
    #[arg(short, long, env = "OIDC_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable
    Pretty,
    /// One JSON object per line
    Json,
}
