//! Reachability probes
//!
//! A probe answers one question: is this address reachable right now? An `Err`
//! means the check itself could not complete (timeout, DNS, refused connection)
//! and counts as unreachable, exactly like `Ok(false)`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::ResourceAddress;

pub mod http;
pub mod ping;

pub use http::HttpProbe;
pub use ping::PingProbe;

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, address: &ResourceAddress) -> Result<bool>;
}

/// Routes IPv4 addresses to ICMP echo and URLs to an HTTP request
pub struct AddressProbe {
    ping: PingProbe,
    http: HttpProbe,
}

impl AddressProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            ping: PingProbe::new(timeout),
            http: HttpProbe::new(timeout)?,
        })
    }
}

#[async_trait]
impl Probe for AddressProbe {
    async fn probe(&self, address: &ResourceAddress) -> Result<bool> {
        match address {
            ResourceAddress::Ipv4(_) => self.ping.probe(address).await,
            ResourceAddress::Http(_) => self.http.probe(address).await,
        }
    }
}
