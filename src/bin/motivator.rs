//! Motivator bot binary.

use clap::{Parser, Subcommand};
use motivator::{BotConfig, JsonTextCatalog, SqlitePreferenceStore, TextRepository};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Motivator: multilingual motivational message bot.
#[derive(Parser)]
#[command(name = "motivator", version, about)]
struct Cli {
    /// Path to TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot (default).
    Run,

    /// Mark every catalog text as new again.
    ResetTexts,

    /// Clear every user's language so they are asked to choose again.
    ResetLanguages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.mode.default_log_filter())),
        )
        .init();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::ResetTexts => {
            let catalog = JsonTextCatalog::open(config.texts_path.clone());
            let changed = catalog.reset_statuses()?;
            println!("{changed} texts marked as new");
            Ok(())
        }
        Command::ResetLanguages => {
            let store = SqlitePreferenceStore::open(&config.db_path)?;
            let changed = store.reset_languages()?;
            println!("{changed} user languages cleared");
            Ok(())
        }
    }
}

/// File (explicit, or the default path when present), then environment.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BotConfig> {
    let mut config = match path {
        Some(path) => BotConfig::from_file(path)?,
        None => {
            let default_path = BotConfig::default_config_path();
            if default_path.exists() {
                BotConfig::from_file(&default_path)?
            } else {
                BotConfig::default()
            }
        }
    };
    config.apply_env_overrides()?;
    Ok(config)
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    if let Err(err) = config.validate() {
        error!("{err}");
        return Err(err.into());
    }
    info!(
        "motivator v{} starting in {} mode",
        env!("CARGO_PKG_VERSION"),
        config.mode
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
        signal_token.cancel();
    });

    motivator::run_bot(config, shutdown).await
}
