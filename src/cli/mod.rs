//! CLI module for Agentwatch
//!
//! Provides commands:
//! - `serve`: Start the server (default)
//! - `check`: Validate configuration and check backends

use clap::{Parser, Subcommand};

use crate::server::config::AppConfig;

pub mod check;

/// Agentwatch CLI
#[derive(Parser, Debug)]
#[command(name = "agentwatch")]
#[command(about = "Real-time event distribution and log aggregation for agent dashboards")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Validate configuration, open the event store and ping Redis
    Check,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Check) => check::run(&config).await,
        Some(Commands::Serve) | None => crate::server::run(config).await,
    }
}
