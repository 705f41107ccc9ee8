//! Platform-neutral dispatch pipeline: what the bot does with a message or
//! a command, separate from how Discord delivers it.

use crate::error::RegistryError;
use crate::metadata::MetadataFetcher;
use crate::preview::{self, PreviewCard};
use crate::registry::DomainRegistry;
use crate::scanner;

/// Outcome of the auto-detection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLink {
    pub domain: String,
    pub url: String,
    pub card: PreviewCard,
}

/// Text reply from a registry command, with its visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Visible to the whole channel (successful mutations, so the team
    /// sees the change log).
    Public(String),
    /// Visible only to the invoking user.
    Ephemeral(String),
}

/// Scan free text for paywalled links. Candidates are checked in order of
/// appearance and only the first tracked one is acted on; one bypass per
/// message keeps the bot from spamming replies.
pub async fn scan_message(
    content: &str,
    registry: &DomainRegistry,
    fetcher: &dyn MetadataFetcher,
) -> Option<DetectedLink> {
    for url in scanner::extract_urls(content) {
        let Some(domain) = scanner::registrable_domain(url) else {
            continue;
        };
        if registry.contains(&domain).await {
            let metadata = fetcher.fetch(url).await;
            let card = preview::render_preview(url, &metadata);
            return Some(DetectedLink {
                domain,
                url: url.to_string(),
                card,
            });
        }
    }
    None
}

/// Normalize and validate manual bypass input. A bare `wsj.com/article`
/// gets `https://` prepended before validation; anything that still does
/// not parse as an http(s) URL with a host is rejected (no fetch happens).
pub fn prepare_bypass_url(raw: &str) -> Option<String> {
    let url = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let parsed = url::Url::parse(&url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(|_| url)
}

/// Fetch metadata for an already-validated URL and render its card. The
/// fetch degrades silently, so this always produces a card.
pub async fn bypass_card(url: &str, fetcher: &dyn MetadataFetcher) -> PreviewCard {
    let metadata = fetcher.fetch(url).await;
    preview::render_preview(url, &metadata)
}

pub async fn list_command(registry: &DomainRegistry) -> CommandReply {
    let domains = registry.list().await;
    if domains.is_empty() {
        return CommandReply::Ephemeral("No domains tracked.".to_string());
    }
    CommandReply::Ephemeral(format!(
        "**Tracked domains ({}):**\n```\n{}\n```",
        domains.len(),
        domains.join("  ")
    ))
}

pub async fn add_command(
    registry: &DomainRegistry,
    args: &str,
) -> Result<CommandReply, RegistryError> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(CommandReply::Ephemeral(
            "No valid domains provided.".to_string(),
        ));
    }

    let added = registry.add(tokens).await?;
    if added.is_empty() {
        return Ok(CommandReply::Ephemeral(
            "Those domains are already tracked.".to_string(),
        ));
    }
    Ok(CommandReply::Public(format!(
        "Added: `{}`",
        added.into_iter().collect::<Vec<_>>().join(", ")
    )))
}

pub async fn remove_command(
    registry: &DomainRegistry,
    args: &str,
) -> Result<CommandReply, RegistryError> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(CommandReply::Ephemeral(
            "No valid domains provided.".to_string(),
        ));
    }

    let removed = registry.remove(tokens).await?;
    if removed.is_empty() {
        return Ok(CommandReply::Ephemeral(
            "Those domains weren't being tracked.".to_string(),
        ));
    }
    Ok(CommandReply::Public(format!(
        "Removed: `{}`",
        removed.into_iter().collect::<Vec<_>>().join(", ")
    )))
}
