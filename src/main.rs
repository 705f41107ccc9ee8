#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use paywall_sentry::Config;
use paywall_sentry::discord::DiscordChannel;
use paywall_sentry::metadata::HttpMetadataFetcher;
use paywall_sentry::registry::{DomainRegistry, JsonFileStore};

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

#[derive(Debug, Parser)]
#[command(
    name = "paywall-sentry",
    about = "Discord bot that rewrites paywalled news links through removepaywalls.com"
)]
struct Cli {
    /// Override the JSON domain-registry file.
    #[arg(long, value_name = "PATH")]
    domains_file: Option<PathBuf>,

    /// Override the plain-text seed list used on first run.
    #[arg(long, value_name = "PATH")]
    seed_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    // This prevents the error: "could not automatically determine the process-level CryptoProvider"
    // when both aws-lc-rs and ring features are available (or neither is explicitly selected).
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.domains_file {
        config.storage.domains_file = path;
    }
    if let Some(path) = cli.seed_file {
        config.storage.seed_file = path;
    }

    let store = Box::new(JsonFileStore::new(&config.storage.domains_file));
    let registry = Arc::new(DomainRegistry::open(store, &config.storage.seed_file)?);
    tracing::info!(count = registry.len().await, "domain registry loaded");

    let fetcher = Arc::new(HttpMetadataFetcher::new());
    let channel = DiscordChannel::new(config.discord.clone(), registry, fetcher);

    if !channel.health_check().await {
        tracing::warn!("Discord token check failed; the gateway connection may be rejected");
    }

    run_supervised(&channel).await
}

/// Keep one gateway session alive, reconnecting with doubling backoff, until
/// Ctrl-C.
async fn run_supervised(channel: &DiscordChannel) -> Result<()> {
    let mut backoff = INITIAL_BACKOFF_SECS;
    loop {
        tokio::select! {
            result = channel.listen() => {
                match result {
                    Ok(()) => {
                        tracing::warn!("Discord session ended; reconnecting");
                        // Clean exit -- reset backoff since the session ran successfully
                        backoff = INITIAL_BACKOFF_SECS;
                    }
                    Err(error) => {
                        tracing::error!("Discord session error: {error:#}; reconnecting");
                    }
                }
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = backoff.saturating_mul(2).min(MAX_BACKOFF_SECS);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                return Ok(());
            }
        }
    }
}
