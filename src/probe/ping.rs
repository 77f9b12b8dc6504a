//! ICMP echo through the system `ping` binary
//!
//! Raw ICMP sockets need elevated privileges; the system binary already has them.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{instrument, trace};

use super::Probe;
use crate::ResourceAddress;

#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
    program: String,
}

impl PingProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            program: String::from("ping"),
        }
    }

    /// Use a different executable (it receives the same arguments as `ping`)
    pub fn with_program(mut self, program: impl ToString) -> Self {
        self.program = program.to_string();
        self
    }

    fn args(&self, ip: &str) -> Vec<String> {
        let wait = self.timeout.as_secs().max(1);
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            wait.to_string(),
            ip.to_string(),
        ]
    }
}

#[async_trait]
impl Probe for PingProbe {
    #[instrument(skip(self), fields(address = %address))]
    async fn probe(&self, address: &ResourceAddress) -> Result<bool> {
        let ResourceAddress::Ipv4(ip) = address else {
            bail!("{address} is not an IPv4 address");
        };

        let mut command = Command::new(&self.program);
        command
            .args(self.args(&ip.to_string()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // -W only bounds the wait for a reply, not name resolution or startup
        let status = tokio::time::timeout(self.timeout + Duration::from_secs(1), command.status())
            .await
            .context("ping timed out")?
            .with_context(|| format!("failed to run {}", self.program))?;

        trace!("ping exited with {status}");
        Ok(status.success())
    }
}
