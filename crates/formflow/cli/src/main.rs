//! Formflow CLI - validate workflow definitions and replay scenarios
//!
//! This CLI lets workflow authors:
//! - Check a definition file before it is loaded into a service
//! - Replay a scripted series of approvals against in-memory storage
//! - Inspect the effective configuration

use clap::{Parser, Subcommand};
use formflow_engine::FormflowConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;
mod scenario;

use commands::{simulate, validate};
use error::{CliError, CliResult};

/// Formflow CLI application
#[derive(Parser)]
#[command(name = "formflow")]
#[command(about = "Formflow - role-gated form workflow engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FORMFLOW_CONFIG")]
    config: Option<String>,

    /// Log level or filter directive (overrides the configured level)
    #[arg(long, env = "FORMFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "FORMFLOW_LOG_JSON")]
    json_logs: bool,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow definition file (YAML or JSON)
    Validate {
        /// Path to the definition file
        file: PathBuf,
    },

    /// Replay a scenario file against in-memory storage
    #[command(alias = "sim")]
    Simulate {
        /// Path to the scenario file
        scenario: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = FormflowConfig::load(cli.config.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, cli.json_logs || config.logging.json);

    match cli.command {
        Commands::Validate { file } => validate::execute(&file, &config.engine, cli.output),
        Commands::Simulate { scenario } => {
            simulate::execute(&scenario, config.engine, cli.output).await
        }
        Commands::Config => output::print_single(&config, cli.output),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
