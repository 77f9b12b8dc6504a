use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument};

use super::{DeliveryError, NotificationChannel, http_client};
use crate::config::Webhook;

/// Posts every alert as JSON to a single URL
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    webhook: Webhook,
}

impl WebhookChannel {
    pub fn new(webhook: Webhook, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            webhook,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    #[instrument(skip(self, body))]
    async fn send(&self, destination: &str, body: &str) -> Result<(), DeliveryError> {
        let payload = json!({
            "destination": destination,
            "message": body,
            "timestamp": Utc::now().to_rfc3339()
        });

        match self.client.post(&self.webhook.url).json(&payload).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    info!("Successfully sent webhook alert");
                    Ok(())
                } else {
                    error!("Webhook alert failed with status: {}", status);
                    Err(DeliveryError::Rejected {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    })
                }
            }
            Err(e) => {
                let err = DeliveryError::from(e);
                error!("Failed to send webhook alert: {}", err);
                Err(err)
            }
        }
    }
}
