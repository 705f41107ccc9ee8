use anyhow::Result;
use serde_json::json;

use super::http_client::DiscordHttpClient;
use super::types::InteractionCallbackType;

/// A recognized slash-command invocation, extracted from interaction data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInvocation {
    /// `/bypass url:<string>`
    Bypass { url: String },
    /// `/paywalls list`
    ListDomains,
    /// `/paywalls add domains:<string>`
    AddDomains { domains: String },
    /// `/paywalls remove domains:<string>`
    RemoveDomains { domains: String },
}

/// Application command definitions, registered on READY.
pub fn build_default_commands() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": "bypass",
            "description": "Bypass paywall for any URL",
            "type": 1,
            "options": [
                {
                    "name": "url",
                    "description": "The article URL to bypass",
                    "type": 3,
                    "required": true
                }
            ]
        }),
        json!({
            "name": "paywalls",
            "description": "Manage paywalled domains",
            "type": 1,
            "options": [
                {
                    "name": "list",
                    "description": "List all tracked paywall domains",
                    "type": 1
                },
                {
                    "name": "add",
                    "description": "Add domain(s) to the paywall list",
                    "type": 1,
                    "options": [
                        {
                            "name": "domains",
                            "description": "Domain(s) to add, space-separated (e.g., 'nytimes wsj')",
                            "type": 3,
                            "required": true
                        }
                    ]
                },
                {
                    "name": "remove",
                    "description": "Remove domain(s) from the paywall list",
                    "type": 1,
                    "options": [
                        {
                            "name": "domains",
                            "description": "Domain(s) to remove, space-separated",
                            "type": 3,
                            "required": true
                        }
                    ]
                }
            ]
        }),
    ]
}

pub async fn register_commands(
    http: &DiscordHttpClient,
    application_id: &str,
    guild_id: Option<&str>,
    commands: &[serde_json::Value],
) -> Result<()> {
    http.register_commands(application_id, guild_id, commands)
        .await
}

/// Map raw interaction data onto a recognized invocation. Unknown commands
/// or malformed payloads yield `None` and are ignored upstream.
pub fn parse_invocation(data: &serde_json::Value) -> Option<CommandInvocation> {
    let name = data.get("name")?.as_str()?;
    match name {
        "bypass" => {
            let url = string_option(data.get("options")?, "url")?;
            Some(CommandInvocation::Bypass { url })
        }
        "paywalls" => {
            let subcommand = data
                .get("options")
                .and_then(|options| options.as_array())
                .and_then(|options| options.first())?;
            let sub_name = subcommand.get("name")?.as_str()?;
            match sub_name {
                "list" => Some(CommandInvocation::ListDomains),
                "add" => {
                    let domains = string_option(subcommand.get("options")?, "domains")?;
                    Some(CommandInvocation::AddDomains { domains })
                }
                "remove" => {
                    let domains = string_option(subcommand.get("options")?, "domains")?;
                    Some(CommandInvocation::RemoveDomains { domains })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn string_option(options: &serde_json::Value, option_name: &str) -> Option<String> {
    options.as_array().and_then(|options| {
        options.iter().find_map(|option| {
            let name = option.get("name")?.as_str()?;
            if name == option_name {
                option.get("value")?.as_str().map(String::from)
            } else {
                None
            }
        })
    })
}

/// ACK an interaction so Discord shows "thinking..." while the fetch runs.
pub async fn defer_interaction(
    http: &DiscordHttpClient,
    interaction_id: &str,
    interaction_token: &str,
) -> Result<()> {
    http.create_interaction_response(
        interaction_id,
        interaction_token,
        InteractionCallbackType::DeferredChannelMessageWithSource as u8,
        None,
    )
    .await
}
