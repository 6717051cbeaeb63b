//! Telegram Archiver CLI - main entry point

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use telegram_archiver::{commands, Config, IterationOrder, MediaPolicy};

#[derive(Parser)]
#[command(name = "telegram_archiver")]
#[command(about = "Telegram channel archiver", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (default: ./config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and archive the configured channels
    Archive {
        /// Override the configured channel list (comma-separated)
        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,

        /// Media download policy: all | images_only
        #[arg(long)]
        media_policy: Option<String>,

        /// Message order in the archive: newest_first | oldest_first
        #[arg(long)]
        order: Option<String>,
    },

    /// Initialize a new session (use only once!)
    InitSession,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match cli.config.as_ref() {
        Some(path) => Config::load_from_file(path).map_err(anyhow::Error::msg)?,
        None => Config::new(),
    };

    init_logging(&config)?;

    match cli.command {
        Commands::Archive {
            channels,
            media_policy,
            order,
        } => {
            if !channels.is_empty() {
                config.channels = channels;
            }
            if let Some(raw) = media_policy.as_deref() {
                config.media_policy = MediaPolicy::parse(raw)?;
            }
            if let Some(raw) = order.as_deref() {
                config.iteration_order = IterationOrder::parse(raw)?;
            }

            commands::archive::run(config).await?;
        }
        Commands::InitSession => {
            commands::init_session::run(&config).await?;
        }
    }

    Ok(())
}

/// Write log lines to the configured file, echoing to stderr when enabled.
fn init_logging(config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = config.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let filter = EnvFilter::from_default_env().add_directive("telegram_archiver=info".parse()?);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .with(
            config
                .log_console
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    Ok(())
}
