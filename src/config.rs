use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::trace;

use crate::util;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Seconds between two sampling cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Minimum seconds between two notifications for the same condition
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,

    /// Historical snapshots older than this are pruned once per day
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Directory holding the alert state, the latest snapshot and the history
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Fixed label attached to every outbound notification
    #[serde(default = "default_system_label")]
    pub system_label: String,

    /// Mount point sampled for disk usage
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,

    pub alert: Option<Alert>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            cooldown: default_cooldown(),
            retention_days: default_retention_days(),
            state_dir: default_state_dir(),
            system_label: default_system_label(),
            disk_path: default_disk_path(),
            thresholds: Thresholds::default(),
            services: default_services(),
            alert: None,
        }
    }
}

impl Config {
    /// Reject configurations the daemon cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval == 0 {
            bail!("interval must be greater than zero");
        }
        if self.cooldown == 0 {
            bail!("cooldown must be greater than zero");
        }

        for (name, value) in [
            ("cpu_high", self.thresholds.cpu_high),
            ("memory_high", self.thresholds.memory_high),
            ("disk_high", self.thresholds.disk_high),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("threshold {name} must be within 0..=100, got {value}");
            }
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                bail!("service names must not be empty");
            }
            if !seen.insert(service.name.as_str()) {
                bail!("duplicate service name: {}", service.name);
            }
        }

        Ok(())
    }
}

/// Alert thresholds in percent. A metric alerts when strictly above its threshold.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_cpu_high")]
    pub cpu_high: f32,
    #[serde(default = "default_memory_high")]
    pub memory_high: f32,
    #[serde(default = "default_disk_high")]
    pub disk_high: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_high: default_cpu_high(),
            memory_high: default_memory_high(),
            disk_high: default_disk_high(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub path: String,
    #[serde(default = "default_host")]
    pub host: String,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port,
            path: path.into(),
            host: default_host(),
        }
    }

    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

fn default_interval() -> u64 {
    60
}

fn default_cooldown() -> u64 {
    300
}

fn default_retention_days() -> u32 {
    30
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./monitoring")
}

fn default_system_label() -> String {
    String::from("n8n-ai-starter-kit")
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_cpu_high() -> f32 {
    80.0
}

fn default_memory_high() -> f32 {
    85.0
}

fn default_disk_high() -> f32 {
    90.0
}

fn default_health_path() -> String {
    String::from("/health")
}

fn default_host() -> String {
    String::from("localhost")
}

fn default_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig::new("n8n", 5678, "/healthz"),
        ServiceConfig::new("web-interface", 8000, "/health"),
        ServiceConfig::new("document-processor", 8001, "/health"),
        ServiceConfig::new("etl-processor", 8002, "/health"),
        ServiceConfig::new("lightrag", 8003, "/health"),
        ServiceConfig::new("gpu-monitor", 8014, "/health"),
    ]
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let mut config: Config =
        serde_json::from_str(content).context("Invalid configuration file provided!")?;
    util::apply_env_overrides(&mut config);
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {path}"))?;
    parse_config(&file_content)
}

/// Configuration used when no file is given: defaults plus environment overrides.
pub fn default_config() -> anyhow::Result<Config> {
    let mut config = Config::default();
    util::apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}
