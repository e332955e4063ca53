//! posescore-booth - interactive capture booth
//!
//! Captures up to three labeled photos through a timed countdown, sends
//! them with the selected category to the scoring service and prints the
//! weighted composite.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use posescore_booth::booth::{spawn_notifier, Booth};
use posescore_common::config::ConfigResolver;
use tokio::io::BufReader;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for posescore-booth
#[derive(Parser, Debug)]
#[command(name = "posescore-booth")]
#[command(about = "Photo capture booth for the PoseScore scoring service")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "POSESCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Scoring service base URL, overrides the config file
    #[arg(long, env = "POSESCORE_SCORER_URL")]
    scorer_url: Option<String>,

    /// Image file to use as the camera feed, overrides the config file
    #[arg(long)]
    source_image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    if let Some(url) = args.scorer_url {
        config.scorer_url = url;
    }
    if let Some(path) = args.source_image {
        config.device.source_image = Some(path);
    }
    config.validate().context("Invalid configuration")?;

    // Logs go to stderr; stdout belongs to the booth UI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "posescore_booth={level},posescore_common={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting posescore-booth {}", env!("CARGO_PKG_VERSION"));
    info!(
        scorer = %config.analyze_url(),
        warmup_ms = config.warmup_ms,
        countdown_secs = config.countdown_secs,
        weighting = ?config.weighting,
        "Booth configured"
    );

    let mut booth = Booth::from_config(&config).context("Failed to build scoring client")?;
    let notifier = spawn_notifier(booth.events());

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = booth.run(stdin) => result.context("Failed reading commands")?,
        _ = signal::ctrl_c() => {
            info!("Interrupted, releasing camera");
            booth.shutdown().await;
        }
    }

    notifier.abort();
    Ok(())
}
