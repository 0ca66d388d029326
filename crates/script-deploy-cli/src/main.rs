//! script-deploy command line
//!
//! # Usage
//!
//! ```bash
//! # Show the resolved deployment order (no target access)
//! script-deploy plan --config demos/script-deploy.yaml
//!
//! # Deploy pending scripts
//! DATABASE_URL=postgresql:///app script-deploy deploy
//!
//! # Show what is deployed, or the raw version table
//! script-deploy status
//! script-deploy status --history --format json
//!
//! # Content hash of a repeatable script
//! script-deploy hash scripts/views.sql
//! ```

mod commands;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use script_deploy_core::CancellationToken;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::{DeploySettings, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "script-deploy")]
#[command(version)]
#[command(about = "Deploy ordered, dependency-aware scripts and record what ran")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file
    #[arg(
        long,
        short,
        global = true,
        env = "SCRIPT_DEPLOY_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved deployment order
    Plan,

    /// Deploy pending scripts to the configured target
    Deploy,

    /// Show deployment state per manifest script
    Status {
        /// Dump the version table instead (postgres only)
        #[arg(long)]
        history: bool,
    },

    /// Print the content hash of a file
    Hash {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "script_deploy=info,script_deploy_core=info,script_deploy_postgres=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = run(&cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Hash { file } => commands::cmd_hash(file, cli.format),
        Commands::Plan => commands::cmd_plan(&load_settings(cli)?, cli.format),
        Commands::Deploy => {
            commands::cmd_deploy(&load_settings(cli)?, cli.format, shutdown_token()).await
        }
        Commands::Status { history } => {
            commands::cmd_status(&load_settings(cli)?, cli.format, *history).await
        }
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<DeploySettings> {
    tracing::debug!(path = %cli.config.display(), "Loading settings");
    Ok(DeploySettings::from_file(&cli.config)?)
}

/// Ctrl-C flips the shutdown flag; the run stops before its next script.
fn shutdown_token() -> CancellationToken {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current script");
            let _ = tx.send(true);
        }
    });
    CancellationToken::from_receiver(rx)
}
