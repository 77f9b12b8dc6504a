//! Environment lookups for the configuration surface
//!
//! Every override is optional; unparsable values are ignored and the value from
//! the config file (or its default) is kept.

pub const PING_PERIOD: &str = "PING_PERIOD";

pub const MAX_TRIES: &str = "MAX_TRIES";

pub const RETRY_PERIOD: &str = "RETRY_PERIOD";

pub const MAILING_PERIOD: &str = "MAILING_PERIOD";

pub const SINGLE_FLIGHT: &str = "SINGLE_FLIGHT";

pub const PROBE_TIMEOUT: &str = "PROBE_TIMEOUT";

pub const SEND_TIMEOUT: &str = "SEND_TIMEOUT";

pub const DATABASE_PATH: &str = "DATABASE_PATH";

pub const API_TOKEN: &str = "API_TOKEN";

pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub fn parse_u64(value: Option<String>) -> Option<u64> {
    value.and_then(|value| value.trim().parse().ok())
}

pub fn parse_bool(value: Option<String>) -> Option<bool> {
    value.and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}
