use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::config::Discord;

/// Embed color for firing alerts (red)
const ALERT_COLOR: u32 = 15158332;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

pub fn build_alert_embed(
    title: &str,
    message: &str,
    system_label: &str,
    timestamp: DateTime<Utc>,
) -> Embed {
    Embed {
        title: Some(format!("🚨 {title}")),
        description: Some(message.to_string()),
        color: Some(ALERT_COLOR),
        footer: Some(EmbedFooter {
            text: format!("System: {system_label}"),
        }),
        timestamp: Some(timestamp.to_rfc3339()),
    }
}

/// Full Discord message for one alert, mentioning `user_id` when configured.
pub fn build_alert_message(
    discord: &Discord,
    title: &str,
    message: &str,
    system_label: &str,
    timestamp: DateTime<Utc>,
) -> Message {
    let embed = build_alert_embed(title, message, system_label, timestamp);
    let mut builder = MessageBuilder::new().add_embed(embed);
    if let Some(user_id) = &discord.user_id {
        builder = builder.content(format!("🚨 {title} <@{user_id}>"));
    }
    builder.build()
}

#[instrument(skip(client, discord, message))]
pub async fn send_message(client: &Client, discord: &Discord, message: &Message) -> bool {
    match client.post(&discord.url).json(message).send().await {
        Ok(response) => {
            if response.status().is_success() {
                info!("Successfully sent Discord message");
                true
            } else {
                error!("Discord message failed with status: {}", response.status());
                if let Ok(error_text) = response.text().await {
                    error!("Discord API error response: {}", error_text);
                }
                false
            }
        }
        Err(e) => {
            error!("Failed to send Discord message: {}", e);
            false
        }
    }
}
