use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Discord credentials and filters, sourced from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Application id used to register slash commands. Without it the bot
    /// still auto-detects links but exposes no commands.
    #[serde(default)]
    pub application_id: Option<String>,
    /// Restrict command registration to a single guild (instant sync,
    /// useful during development).
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Where the domain registry lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Durable JSON set of tracked domains.
    pub domains_file: PathBuf,
    /// Plain-text seed list used when the JSON file does not exist yet.
    pub seed_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the environment (after `dotenvy` has run).
    ///
    /// A missing `DISCORD_TOKEN` is fatal; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = env::var("DISCORD_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            discord: DiscordConfig {
                bot_token,
                application_id: non_empty_env("DISCORD_APPLICATION_ID"),
                guild_id: non_empty_env("DISCORD_GUILD_ID"),
            },
            storage: StorageConfig {
                domains_file: env_path("PAYWALL_DOMAINS_FILE", "paywalled_domains.json"),
                seed_file: env_path("PAYWALL_SEED_FILE", "domains.txt"),
            },
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_path(name: &str, default: &str) -> PathBuf {
    non_empty_env(name).map_or_else(|| PathBuf::from(default), PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_path_falls_back_to_default() {
        assert_eq!(
            env_path("PAYWALL_SENTRY_TEST_UNSET_VAR", "domains.txt"),
            PathBuf::from("domains.txt")
        );
    }

    #[test]
    fn non_empty_env_rejects_unset() {
        assert!(non_empty_env("PAYWALL_SENTRY_TEST_UNSET_VAR").is_none());
    }
}
