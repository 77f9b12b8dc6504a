use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};

use async_trait::async_trait;

use super::{DeliveryError, NotificationChannel, http_client};
use crate::config::Telegram;

/// Body of a Bot API `sendMessage` call
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub chat_id: String,
    pub text: String,
}

pub struct MessageBuilder {
    chat_id: String,
    text: String,
}

impl MessageBuilder {
    pub fn new(chat_id: impl ToString) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            text: String::new(),
        }
    }

    pub fn text(mut self, text: impl ToString) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn build(self) -> Message {
        Message {
            chat_id: self.chat_id,
            text: self.text,
        }
    }
}

/// Delivers alerts through a Telegram bot
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    client: Client,
    config: Telegram,
}

impl TelegramChannel {
    pub fn new(config: Telegram, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.trim_end_matches('/'),
            self.config.token
        )
    }

    #[instrument(skip(self, message), fields(chat_id = %message.chat_id))]
    pub async fn send_message(&self, message: &Message) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(message)
            .send()
            .await
            .map_err(DeliveryError::from)
            .inspect_err(|e| error!("Failed to send Telegram message: {}", e))?;

        let status = response.status();
        if status.is_success() {
            debug!("Successfully sent Telegram message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!("Telegram message failed with status: {}", status);
        error!("Telegram API error response: {}", body);
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, destination: &str, body: &str) -> Result<(), DeliveryError> {
        let message = MessageBuilder::new(destination).text(body).build();
        self.send_message(&message).await
    }
}
