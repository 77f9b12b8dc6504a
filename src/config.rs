use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{trace, warn};

use crate::util;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence, queue is lost on restart)
    #[serde(rename = "none")]
    None,

    /// SQLite database holding resources, subscribers, journal and queue
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./pingwatch.db")
}

/// Where alerts are delivered
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelConfig {
    Telegram(Telegram),
    Webhook(Webhook),
    /// Only log the messages
    #[default]
    Log,
}

#[derive(Clone, PartialEq, serde::Deserialize)]
pub struct Telegram {
    pub token: String,
    #[serde(default = "default_telegram_api")]
    pub api_url: String,
}

// the token grants full control over the bot, keep it out of the logs
impl fmt::Debug for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telegram")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn default_telegram_api() -> String {
    String::from("https://api.telegram.org")
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Config {
    /// Seconds between probe ticks
    #[serde(default = "default_period")]
    pub period: u64,

    /// Probe attempts per resource and tick
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Seconds between two attempts of the same resource
    #[serde(default = "default_retry_period")]
    pub retry_period: u64,

    /// Seconds between two drains of the notification queue
    #[serde(default = "default_mailing_period")]
    pub mailing_period: u64,

    /// Skip resources that are still retrying from an earlier tick
    #[serde(default)]
    pub single_flight: bool,

    /// Seconds a single probe may take
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// Seconds a single channel send may take
    #[serde(default = "default_send_timeout")]
    pub send_timeout: u64,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub channel: ChannelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period: default_period(),
            max_tries: default_max_tries(),
            retry_period: default_retry_period(),
            mailing_period: default_mailing_period(),
            single_flight: false,
            probe_timeout: default_probe_timeout(),
            send_timeout: default_send_timeout(),
            storage: StorageConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

fn default_period() -> u64 {
    60
}

fn default_max_tries() -> u32 {
    3
}

fn default_retry_period() -> u64 {
    8
}

fn default_mailing_period() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_send_timeout() -> u64 {
    10
}

impl Config {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period)
    }

    pub fn retry_period(&self) -> Duration {
        Duration::from_secs(self.retry_period)
    }

    pub fn mailing_period(&self) -> Duration {
        Duration::from_secs(self.mailing_period)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout)
    }

    /// Apply overrides from `lookup` (usually the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(period) = util::parse_u64(lookup(util::PING_PERIOD)) {
            self.period = period;
        }
        if let Some(max_tries) = util::parse_u64(lookup(util::MAX_TRIES)) {
            self.max_tries = u32::try_from(max_tries).unwrap_or(u32::MAX);
        }
        if let Some(retry_period) = util::parse_u64(lookup(util::RETRY_PERIOD)) {
            self.retry_period = retry_period;
        }
        if let Some(mailing_period) = util::parse_u64(lookup(util::MAILING_PERIOD)) {
            self.mailing_period = mailing_period;
        }
        if let Some(single_flight) = util::parse_bool(lookup(util::SINGLE_FLIGHT)) {
            self.single_flight = single_flight;
        }
        if let Some(timeout) = util::parse_u64(lookup(util::PROBE_TIMEOUT)) {
            self.probe_timeout = timeout;
        }
        if let Some(timeout) = util::parse_u64(lookup(util::SEND_TIMEOUT)) {
            self.send_timeout = timeout;
        }
        if let Some(path) = lookup(util::DATABASE_PATH) {
            self.storage = StorageConfig::Sqlite {
                path: PathBuf::from(path),
            };
        }
        if let Some(token) = lookup(util::API_TOKEN) {
            match &mut self.channel {
                ChannelConfig::Telegram(telegram) => telegram.token = token,
                ChannelConfig::Log => {
                    self.channel = ChannelConfig::Telegram(Telegram {
                        token,
                        api_url: default_telegram_api(),
                    })
                }
                ChannelConfig::Webhook(_) => warn!(
                    "{} is set but the webhook channel is configured, ignoring it",
                    util::API_TOKEN
                ),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.period == 0 {
            bail!("period must be at least one second");
        }
        if self.max_tries == 0 {
            bail!("max_tries must be at least 1");
        }
        if self.mailing_period == 0 {
            bail!("mailing_period must be at least one second");
        }
        if self.probe_timeout == 0 {
            bail!("probe_timeout must be at least one second");
        }
        if self.send_timeout == 0 {
            bail!("send_timeout must be at least one second");
        }
        if self.mailing_period >= self.period {
            warn!(
                "mailing period ({}s) is not shorter than the probe period ({}s)",
                self.mailing_period, self.period
            );
        }
        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Load the file (if any), apply environment overrides and validate
pub fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    config.apply_overrides(util::env_lookup);
    config.validate()?;
    Ok(config)
}
