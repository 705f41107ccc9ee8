pub mod commands;
pub mod gateway;
pub mod http_client;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::DiscordConfig;
use crate::handler::{self, CommandReply};
use crate::metadata::MetadataFetcher;
use crate::preview::PreviewCard;
use crate::registry::DomainRegistry;

use self::commands::{CommandInvocation, build_default_commands, defer_interaction, parse_invocation};
use self::gateway::{DiscordGateway, DiscordGatewayState, GatewayEvent};
use self::http_client::DiscordHttpClient;
use self::types::{
    DEFAULT_INTENTS, EMBED_ACCENT_COLOR, InteractionCallbackType, InteractionType,
    MESSAGE_FLAG_EPHEMERAL,
};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// The Discord-facing side of the bot: routes gateway events into the
/// dispatch pipeline and renders its outcomes as replies and interaction
/// responses.
pub struct DiscordChannel {
    http: DiscordHttpClient,
    gateway_state: Arc<DiscordGatewayState>,
    config: DiscordConfig,
    bot_user_id: std::sync::Mutex<Option<String>>,
    registry: Arc<DomainRegistry>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl DiscordChannel {
    pub fn new(
        config: DiscordConfig,
        registry: Arc<DomainRegistry>,
        fetcher: Arc<dyn MetadataFetcher>,
    ) -> Self {
        Self {
            http: DiscordHttpClient::new(&config.bot_token),
            gateway_state: Arc::new(DiscordGatewayState::default()),
            config,
            bot_user_id: std::sync::Mutex::new(None),
            registry,
            fetcher,
        }
    }

    /// Token sanity probe; a failure here usually means a bad credential.
    pub async fn health_check(&self) -> bool {
        self.http.get_current_user().await.is_ok()
    }

    /// Run one gateway session, handling events until it ends. Returning
    /// `Ok` means the session closed cleanly and the caller should
    /// reconnect.
    pub async fn listen(&self) -> Result<()> {
        let gateway = DiscordGateway::new(
            self.config.bot_token.clone(),
            DEFAULT_INTENTS,
            Arc::clone(&self.gateway_state),
        );

        let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<GatewayEvent>(100);

        let mut gateway_handle = {
            let http = DiscordHttpClient::new(&self.config.bot_token);
            tokio::spawn(async move { gateway.connect_and_listen(&http, &event_tx).await })
        };

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.handle_gateway_event(event).await;
                }
                result = &mut gateway_handle => {
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(e),
                        Err(e) => anyhow::bail!("Discord gateway task panicked: {e}"),
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_gateway_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { user_id, .. } => {
                self.handle_ready(&user_id).await;
            }
            GatewayEvent::MessageCreate {
                channel_id,
                author_id,
                author_is_bot,
                content,
                message_id,
            } => {
                self.handle_message_create(
                    &channel_id,
                    &author_id,
                    author_is_bot,
                    &content,
                    &message_id,
                )
                .await;
            }
            GatewayEvent::InteractionCreate {
                interaction_id,
                interaction_token,
                interaction_type,
                user_id,
                data,
                ..
            } => {
                self.handle_interaction_create(
                    &interaction_id,
                    &interaction_token,
                    interaction_type,
                    &user_id,
                    &data,
                )
                .await;
            }
        }
    }

    async fn handle_ready(&self, user_id: &str) {
        self.set_bot_user_id(user_id);
        tracing::info!("Discord: connected as user {user_id}");

        if let Some(app_id) = &self.config.application_id {
            let cmds = build_default_commands();
            if let Err(e) = commands::register_commands(
                &self.http,
                app_id,
                self.config.guild_id.as_deref(),
                &cmds,
            )
            .await
            {
                tracing::warn!("Discord: failed to register slash commands: {e}");
            } else {
                tracing::info!("Discord: slash commands registered");
            }
        } else {
            tracing::warn!("Discord: no application id configured, slash commands disabled");
        }
    }

    /// Auto-detection path. Messages from automated authors (other bots or
    /// this bot itself) are dropped outright to prevent bot-to-bot loops.
    async fn handle_message_create(
        &self,
        channel_id: &str,
        author_id: &str,
        author_is_bot: bool,
        content: &str,
        message_id: &str,
    ) {
        if author_is_bot || self.is_bot_user(author_id) {
            return;
        }

        let Some(detected) =
            handler::scan_message(content, &self.registry, self.fetcher.as_ref()).await
        else {
            return;
        };

        let embed = card_to_embed(&detected.card);
        match self.http.reply_with_embed(channel_id, message_id, embed).await {
            Ok(()) => {
                tracing::info!(
                    domain = %detected.domain,
                    author = %author_id,
                    "auto-bypassed paywalled link"
                );
            }
            Err(error) => {
                tracing::warn!("Discord: failed to send bypass reply: {error:#}");
            }
        }
    }

    async fn handle_interaction_create(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        interaction_type: u64,
        user_id: &str,
        data: &serde_json::Value,
    ) {
        if InteractionType::from_u64(interaction_type) != Some(InteractionType::ApplicationCommand)
        {
            return;
        }
        let Some(invocation) = parse_invocation(data) else {
            return;
        };

        if let Err(error) = self
            .dispatch_command(interaction_id, interaction_token, user_id, &invocation)
            .await
        {
            tracing::error!("Discord: command {invocation:?} failed: {error:#}");
            self.send_generic_failure(interaction_id, interaction_token)
                .await;
        }
    }

    async fn dispatch_command(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        user_id: &str,
        invocation: &CommandInvocation,
    ) -> Result<()> {
        match invocation {
            CommandInvocation::Bypass { url } => {
                let Some(url) = handler::prepare_bypass_url(url) else {
                    return self
                        .respond_text(interaction_id, interaction_token, "Invalid URL.", true)
                        .await;
                };

                // The fetch can take up to its full timeout; ACK first so
                // the interaction token does not expire.
                defer_interaction(&self.http, interaction_id, interaction_token).await?;
                let card = handler::bypass_card(&url, self.fetcher.as_ref()).await;
                let app_id = self
                    .config
                    .application_id
                    .as_deref()
                    .context("application id required for interaction followup")?;
                self.http
                    .edit_original_interaction_response(
                        app_id,
                        interaction_token,
                        json!({ "embeds": [card_to_embed(&card)] }),
                    )
                    .await?;
                tracing::info!(user = %user_id, url = %url, "manual bypass served");
                Ok(())
            }
            CommandInvocation::ListDomains => {
                let reply = handler::list_command(&self.registry).await;
                self.respond_reply(interaction_id, interaction_token, &reply)
                    .await
            }
            CommandInvocation::AddDomains { domains } => {
                let reply = handler::add_command(&self.registry, domains).await?;
                if matches!(reply, CommandReply::Public(_)) {
                    tracing::info!(user = %user_id, domains = %domains, "domains added");
                }
                self.respond_reply(interaction_id, interaction_token, &reply)
                    .await
            }
            CommandInvocation::RemoveDomains { domains } => {
                let reply = handler::remove_command(&self.registry, domains).await?;
                if matches!(reply, CommandReply::Public(_)) {
                    tracing::info!(user = %user_id, domains = %domains, "domains removed");
                }
                self.respond_reply(interaction_id, interaction_token, &reply)
                    .await
            }
        }
    }

    async fn respond_reply(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        reply: &CommandReply,
    ) -> Result<()> {
        match reply {
            CommandReply::Public(content) => {
                self.respond_text(interaction_id, interaction_token, content, false)
                    .await
            }
            CommandReply::Ephemeral(content) => {
                self.respond_text(interaction_id, interaction_token, content, true)
                    .await
            }
        }
    }

    async fn respond_text(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        content: &str,
        ephemeral: bool,
    ) -> Result<()> {
        let mut data = json!({ "content": content });
        if ephemeral {
            data["flags"] = json!(MESSAGE_FLAG_EPHEMERAL);
        }
        self.http
            .create_interaction_response(
                interaction_id,
                interaction_token,
                InteractionCallbackType::ChannelMessageWithSource as u8,
                Some(data),
            )
            .await
    }

    /// Last-resort reply when a command handler errored. Tries the direct
    /// response first; if the interaction was already deferred, falls back
    /// to editing the deferred response.
    async fn send_generic_failure(&self, interaction_id: &str, interaction_token: &str) {
        if self
            .respond_text(interaction_id, interaction_token, GENERIC_FAILURE, true)
            .await
            .is_ok()
        {
            return;
        }
        if let Some(app_id) = self.config.application_id.as_deref()
            && let Err(error) = self
                .http
                .edit_original_interaction_response(
                    app_id,
                    interaction_token,
                    json!({ "content": GENERIC_FAILURE }),
                )
                .await
        {
            tracing::warn!("Discord: failed to deliver failure notice: {error:#}");
        }
    }

    fn set_bot_user_id(&self, user_id: &str) {
        if let Ok(mut guard) = self.bot_user_id.lock() {
            *guard = Some(user_id.to_string());
        }
    }

    fn is_bot_user(&self, user_id: &str) -> bool {
        self.bot_user_id
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .is_some_and(|id| id == user_id)
    }
}

/// Render a preview card as a Discord embed. Absent card fields are left
/// out of the payload entirely, matching the presence/absence contract.
pub fn card_to_embed(card: &PreviewCard) -> serde_json::Value {
    let mut embed = json!({
        "title": card.title,
        "url": card.link,
        "color": EMBED_ACCENT_COLOR,
        "footer": { "text": card.footer },
    });
    if let Some(description) = &card.description {
        embed["description"] = json!(description);
    }
    if let Some(site_name) = &card.site_name {
        embed["author"] = json!({ "name": site_name });
    }
    if let Some(thumbnail) = &card.thumbnail {
        embed["thumbnail"] = json!({ "url": thumbnail });
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PageMetadata;
    use crate::preview::render_preview;
    use crate::registry::{DomainRegistry, JsonFileStore};
    use std::path::Path;

    fn test_config() -> DiscordConfig {
        DiscordConfig {
            bot_token: "fake-token".to_string(),
            application_id: None,
            guild_id: None,
        }
    }

    struct NullFetcher;

    #[async_trait::async_trait]
    impl MetadataFetcher for NullFetcher {
        async fn fetch(&self, _url: &str) -> PageMetadata {
            PageMetadata::default()
        }
    }

    fn test_channel(dir: &tempfile::TempDir) -> DiscordChannel {
        let store = Box::new(JsonFileStore::new(dir.path().join("domains.json")));
        let registry =
            Arc::new(DomainRegistry::open(store, Path::new("no-seed")).expect("registry"));
        DiscordChannel::new(test_config(), registry, Arc::new(NullFetcher))
    }

    #[test]
    fn bot_user_id_tracking() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ch = test_channel(&dir);
        assert!(!ch.is_bot_user("123"));
        ch.set_bot_user_id("123");
        assert!(ch.is_bot_user("123"));
        assert!(!ch.is_bot_user("456"));
    }

    #[test]
    fn full_card_maps_onto_embed() {
        let metadata = PageMetadata {
            title: Some("Big Story".into()),
            description: Some("What happened".into()),
            image: Some("https://img.example.com/a.jpg".into()),
            site_name: Some("The Daily".into()),
        };
        let card = render_preview("https://nytimes.com/a", &metadata);
        let embed = card_to_embed(&card);

        assert_eq!(embed["title"], "Big Story");
        assert_eq!(embed["url"], "https://removepaywalls.com/https://nytimes.com/a");
        assert_eq!(embed["description"], "What happened");
        assert_eq!(embed["author"]["name"], "The Daily");
        assert_eq!(embed["thumbnail"]["url"], "https://img.example.com/a.jpg");
        assert_eq!(embed["footer"]["text"], "via removepaywalls.com");
        assert_eq!(embed["color"], 0x0058_65F2);
    }

    #[test]
    fn absent_card_fields_are_omitted_from_embed() {
        let card = render_preview("https://wsj.com/a", &PageMetadata::default());
        let embed = card_to_embed(&card);

        assert_eq!(embed["title"], "Read Article");
        assert!(embed.get("description").is_none());
        assert!(embed.get("author").is_none());
        assert!(embed.get("thumbnail").is_none());
        assert_eq!(embed["footer"]["text"], "via removepaywalls.com");
    }
}
