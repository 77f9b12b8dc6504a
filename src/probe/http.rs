use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::{instrument, trace};

use super::Probe;
use crate::ResourceAddress;

/// Reachable means the endpoint answered with a 2xx status (after redirects)
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP client (reused across requests for efficiency)
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    #[instrument(skip(self), fields(address = %address))]
    async fn probe(&self, address: &ResourceAddress) -> Result<bool> {
        let ResourceAddress::Http(url) = address else {
            bail!("{address} is not an http(s) address");
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        trace!("{url} answered with {status}");

        Ok(status.is_success())
    }
}
