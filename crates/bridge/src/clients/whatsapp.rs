//! WhatsApp Cloud API client for sending messages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared_types::whatsapp::OutboundMessage;
use shared_types::ContactId;
use std::time::Duration;

use super::Messenger;
use crate::config::WhatsAppConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct WhatsAppClient {
    http: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.graph_base.trim_end_matches('/'),
            self.config.phone_id
        )
    }

    /// POST a message and return the API's JSON answer.
    pub async fn send(&self, message: &OutboundMessage) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.config.token)
            .json(message)
            .send()
            .await
            .context("Failed to reach WhatsApp API")?
            .error_for_status()
            .context("WhatsApp API rejected message")?;

        let body = response
            .json::<serde_json::Value>()
            .await
            .context("Failed to parse WhatsApp API response")?;

        tracing::debug!("WhatsApp message sent to {}: {}", message.to, body);
        Ok(body)
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_availability_prompt(
        &self,
        to: &ContactId,
        event_id: &str,
        title: &str,
    ) -> Result<()> {
        let message = OutboundMessage::availability_prompt(to.as_str(), event_id, title);
        self.send(&message).await?;
        Ok(())
    }

    async fn send_text(&self, to: &ContactId, body: &str) -> Result<()> {
        self.send(&OutboundMessage::text(to.as_str(), body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_joins_base_and_phone_id() {
        let client = WhatsAppClient::new(WhatsAppConfig {
            token: "token".to_string(),
            phone_id: "1098765".to_string(),
            graph_base: "https://graph.facebook.com/v20.0/".to_string(),
        })
        .expect("client");

        assert_eq!(
            client.messages_url(),
            "https://graph.facebook.com/v20.0/1098765/messages"
        );
    }
}
