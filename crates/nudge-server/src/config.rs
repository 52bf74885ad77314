use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::net::TcpListener;

use nudge_gateway::connection::DEFAULT_WRITE_TIMEOUT;
use nudge_gateway::registry::DEFAULT_SUBSCRIBER_BUFFER;
use nudge_gateway::scanner::DEFAULT_SCAN_INTERVAL;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub scan_interval: Duration,
    pub write_timeout: Duration,
    pub subscriber_buffer: usize,
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let scan_interval_ms: u64 = parse_or(
            &lookup,
            "NUDGE_SCAN_INTERVAL_MS",
            millis(defaults.scan_interval),
        )?;
        if scan_interval_ms == 0 {
            bail!("NUDGE_SCAN_INTERVAL_MS must be greater than zero");
        }
        let subscriber_buffer: usize =
            parse_or(&lookup, "NUDGE_SUBSCRIBER_BUFFER", defaults.subscriber_buffer)?;
        if subscriber_buffer == 0 {
            bail!("NUDGE_SUBSCRIBER_BUFFER must be greater than zero");
        }
        let write_timeout_ms: u64 = parse_or(
            &lookup,
            "NUDGE_WRITE_TIMEOUT_MS",
            millis(defaults.write_timeout),
        )?;
        if write_timeout_ms == 0 {
            bail!("NUDGE_WRITE_TIMEOUT_MS must be greater than zero");
        }
        let shutdown_grace_secs: u64 = parse_or(
            &lookup,
            "NUDGE_SHUTDOWN_GRACE_SECS",
            defaults.shutdown_grace.as_secs(),
        )?;

        Ok(Self {
            host: lookup("NUDGE_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "NUDGE_PORT", defaults.port)?,
            scan_interval: Duration::from_millis(scan_interval_ms),
            write_timeout: Duration::from_millis(write_timeout_ms),
            subscriber_buffer,
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
        })
    }

    /// Bind the listen socket. `host` may be a name or an IPv6 literal.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", self.host, self.port))
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}
