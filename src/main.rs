use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use warbler::app::Session;
use warbler::cli::commands::{self, ConsoleNotifier};
use warbler::cli::{Cli, Commands};
use warbler::config::Config;

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load(&path)?),
        None => {
            let path = Config::default_config_path()?;
            if path.exists() {
                Ok(Config::load(&path)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config).context("loading configuration")?;
    config.debug = config.debug.max(cli.debug);
    config.quiet |= cli.quiet;

    // RUST_LOG wins over the config-derived level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let notifier = ConsoleNotifier::new(config.debug > 0);
    let mut session = Session::new(config)?;

    match cli.command {
        Commands::Timeline { watch, interval } => {
            if watch {
                commands::watch_timeline(&mut session, &notifier, interval.as_deref()).await?;
            } else {
                commands::show_timeline(&mut session, &notifier).await?;
            }
        }
        Commands::Search { query } => {
            commands::search(&mut session, &notifier, &query).await?;
        }
        Commands::Stream => {
            commands::follow_stream(&session, &notifier).await?;
        }
        Commands::Post { text } => {
            commands::post(&session, &text).await?;
        }
        Commands::Token { username, password } => {
            commands::obtain_token(&mut session, &username, &password).await?;
        }
    }

    Ok(())
}
