//! External notification channels
//!
//! The pipeline hands each message to a channel exactly once per claim. Channels
//! don't retry; a failure is reported back to the delivery consumer, which logs it.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::ChannelConfig;

pub mod telegram;
pub mod webhook;

pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

#[derive(Debug)]
pub enum DeliveryError {
    /// The request never got an answer
    Transport(String),

    /// The remote side answered with a non-success status
    Rejected { status: u16, body: String },
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Transport(msg) => write!(f, "failed to reach channel: {}", msg),
            DeliveryError::Rejected { status, body } => {
                write!(f, "channel rejected message with status {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

// the request URL can carry credentials (the bot token is part of the path)
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transport(err.without_url().to_string())
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, destination: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, destination: &str, body: &str) -> Result<(), DeliveryError> {
        tracing::info!(destination, "{body}");
        Ok(())
    }
}

/// HTTP client shared by the channels; `timeout` bounds a whole send
fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

/// Build the channel selected in the configuration
pub fn from_config(
    config: &ChannelConfig,
    timeout: Duration,
) -> Result<Box<dyn NotificationChannel>> {
    Ok(match config {
        ChannelConfig::Telegram(telegram) => {
            Box::new(TelegramChannel::new(telegram.clone(), timeout)?)
        }
        ChannelConfig::Webhook(webhook) => Box::new(WebhookChannel::new(webhook.clone(), timeout)?),
        ChannelConfig::Log => Box::new(LogChannel),
    })
}
