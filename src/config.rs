//! Runtime configuration.
//!
//! Loaded from a YAML file named by `METADUMP_CONFIG` (defaults otherwise),
//! then overridden field by field from `METADUMP_*` environment variables.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Metadata port used when none is configured.
pub const DEFAULT_PORT: u16 = 5500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Udp,
    Tcp,
    Http,
}

impl TargetKind {
    fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Some(TargetKind::Udp),
            "tcp" => Some(TargetKind::Tcp),
            "http" => Some(TargetKind::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub kind: TargetKind,
    pub host: String,
    pub port: u16,
    pub url: Option<String>,
    pub keep_alive: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            kind: TargetKind::Tcp,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            url: None,
            keep_alive: false,
        }
    }
}

/// Backoff delays for transports. All retries are fixed-delay and unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after a send that could not be dispatched at all.
    pub backpressure_delay: Duration,
    /// Wait after a dispatched send that failed.
    pub failure_delay: Duration,
    /// Wait between TCP connection attempts.
    pub reconnect_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backpressure_delay: Duration::from_secs(1),
            failure_delay: Duration::from_millis(250),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RetryConfig {
    backpressure_ms: u64,
    failure_ms: u64,
    reconnect_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            backpressure_ms: policy.backpressure_delay.as_millis() as u64,
            failure_ms: policy.failure_delay.as_millis() as u64,
            reconnect_ms: policy.reconnect_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub target_fps: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { target_fps: 15 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    retry: RetryConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Loads the file named by `METADUMP_CONFIG`, if any, then applies
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("METADUMP_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        if cfg.target.kind == TargetKind::Http && cfg.target.url.is_none() {
            anyhow::bail!("http target requires a url");
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(kind) = std::env::var("METADUMP_KIND") {
            self.target.kind = TargetKind::from_name(&kind)
                .with_context(|| format!("unknown target kind {kind:?}"))?;
        }
        if let Ok(host) = std::env::var("METADUMP_HOST") {
            self.target.host = host;
        }
        if let Ok(port) = std::env::var("METADUMP_PORT") {
            self.target.port = port
                .parse()
                .with_context(|| format!("invalid METADUMP_PORT {port:?}"))?;
        }
        if let Ok(url) = std::env::var("METADUMP_URL") {
            self.target.url = Some(url);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backpressure_delay: Duration::from_millis(self.retry.backpressure_ms),
            failure_delay: Duration::from_millis(self.retry.failure_ms),
            reconnect_delay: Duration::from_millis(self.retry.reconnect_ms),
        }
    }
}
