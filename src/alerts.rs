//! NotificationDispatcher - delivers fired alerts to the configured sink
//!
//! Delivery is fire-and-forget: one attempt per alert, no retries. A failed
//! attempt is logged and reported as `false`; retrying inside the sampling
//! loop could push the next cycle past its interval.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use crate::config::{Alert, Webhook};
use crate::discord;

/// Upper bound for one outbound notification
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Sink for fired alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification. Returns whether the sink accepted it.
    async fn dispatch(&self, title: &str, message: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    client: Client,
    sink: Option<Alert>,
    system_label: String,
}

impl NotificationDispatcher {
    pub fn new(sink: Option<Alert>, system_label: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(DISPATCH_TIMEOUT)
            .build()
            .context("failed to build HTTP client for notifications")?;

        Ok(Self {
            client,
            sink,
            system_label: system_label.into(),
        })
    }

    pub fn system_label(&self) -> &str {
        &self.system_label
    }

    /// JSON body posted to a generic webhook sink
    pub fn webhook_payload(&self, title: &str, message: &str, timestamp: DateTime<Utc>) -> Value {
        json!({
            "title": title,
            "message": message,
            "timestamp": timestamp.to_rfc3339(),
            "system": self.system_label,
        })
    }

    #[instrument(skip(self, webhook, message))]
    async fn send_webhook_alert(&self, webhook: &Webhook, title: &str, message: &str) -> bool {
        let payload = self.webhook_payload(title, message, Utc::now());

        match self.client.post(&webhook.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                    true
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                    false
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for NotificationDispatcher {
    async fn dispatch(&self, title: &str, message: &str) -> bool {
        match &self.sink {
            Some(Alert::Webhook(webhook)) => self.send_webhook_alert(webhook, title, message).await,
            Some(Alert::Discord(discord)) => {
                let payload = discord::build_alert_message(
                    discord,
                    title,
                    message,
                    &self.system_label,
                    Utc::now(),
                );
                discord::send_message(&self.client, discord, &payload).await
            }
            None => {
                warn!("no notification sink configured, dropping alert: {title}: {message}");
                false
            }
        }
    }
}
