//! Rightsize CLI
//!
//! Computes memory and CPU request recommendations for the containers of
//! one namespace from usage signals in a Prometheus-compatible backend.

mod commands;
mod config;
mod export;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::rightsize::RunArgs;
use commands::{doctor, rightsize};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Rightsize CLI
#[derive(Parser)]
#[command(name = "rightsize")]
#[command(author, version, about = "Rightsizing recommendations for Kubernetes container requests", long_about = None)]
pub struct Cli {
    /// Metrics backend API root (overrides config and RIGHTSIZE_GATEWAY_URL)
    #[arg(long, global = true)]
    pub gateway_url: Option<String>,

    /// Path to config file (default: ~/.config/rightsize/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute recommendations for a namespace
    Run(RunArgs),

    /// Check connectivity to the metrics backend
    Doctor,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays clean for tables and JSON
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config = config::CliConfig::load(cli.config.as_deref())?.with_gateway_url(cli.gateway_url);

    match cli.command {
        Commands::Run(args) => rightsize::run(&config, &args, cli.format).await?,
        Commands::Doctor => doctor::doctor(&config).await?,
    }

    Ok(())
}
