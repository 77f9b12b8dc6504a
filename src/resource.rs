//! Monitored resources and address validation
//!
//! A resource is reachable-checked either by ICMP echo (IPv4 dotted quad) or by an
//! HTTP request (http/https URL). Addresses are validated once, when the
//! descriptor is built, so the rest of the pipeline can rely on them.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$|^https?://\S+$").expect("address pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Address is neither a dotted quad nor an http(s) URL
    InvalidAddress(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InvalidAddress(address) => {
                write!(f, "invalid resource address: '{}'", address)
            }
        }
    }
}

impl std::error::Error for ResourceError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceAddress {
    Ipv4(Ipv4Addr),
    Http(String),
}

impl ResourceAddress {
    pub fn parse(address: &str) -> Result<Self, ResourceError> {
        let address = address.trim();
        if !ADDRESS_PATTERN.is_match(address) {
            return Err(ResourceError::InvalidAddress(address.to_string()));
        }

        if address.starts_with("http://") || address.starts_with("https://") {
            return Ok(ResourceAddress::Http(address.to_string()));
        }

        // the pattern allows octets up to 999
        address
            .parse::<Ipv4Addr>()
            .map(ResourceAddress::Ipv4)
            .map_err(|_| ResourceError::InvalidAddress(address.to_string()))
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceAddress::Ipv4(ip) => write!(f, "{ip}"),
            ResourceAddress::Http(url) => write!(f, "{url}"),
        }
    }
}

impl TryFrom<String> for ResourceAddress {
    type Error = ResourceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceAddress> for String {
    fn from(value: ResourceAddress) -> Self {
        value.to_string()
    }
}

/// Point-in-time view of a monitored resource
///
/// The canonical record lives in the storage backend; the scheduler takes a fresh
/// snapshot of these on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: i64,
    pub address: ResourceAddress,
    pub name: String,
}

impl ResourceDescriptor {
    pub fn new(id: i64, address: &str, name: impl ToString) -> Result<Self, ResourceError> {
        Ok(Self {
            id,
            address: ResourceAddress::parse(address)?,
            name: name.to_string(),
        })
    }
}
