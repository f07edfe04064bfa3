//! ChatProbe CLI - Main Entry Point
//!
//! Runs questions from a result workbook against a live chat UI, captures
//! the answers, and grades them against the expected answers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use chatprobe_common::ProbeConfig;
use commands::{init, run, targets, validate};

/// ChatProbe - Regression testing for web chat interfaces
#[derive(Parser)]
#[command(name = "chatprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "CHATPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture answers for a target, then grade them
    Run(run::RunArgs),

    /// Grade the captured answers of a result workbook
    Validate(validate::ValidateArgs),

    /// List available target profiles
    Targets,

    /// Write a configuration file with the default settings
    Init(init::InitArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(chatprobe_common::default_config_path);

    match cli.command {
        Commands::Run(args) => run::execute(args, &load_config(&config_path)?, cli.format).await?,
        Commands::Validate(args) => {
            validate::execute(args, &load_config(&config_path)?, cli.format).await?
        }
        Commands::Targets => targets::execute(&load_config(&config_path)?, cli.format)?,
        Commands::Init(args) => init::execute(args, &config_path)?,
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<ProbeConfig> {
    ProbeConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}
