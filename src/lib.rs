pub mod alerts;
pub mod config;
pub mod daemon;
pub mod discord;
pub mod monitors;
pub mod report;
pub mod storage;
pub mod util;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable, timestamped sample of host and service health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl MetricsSnapshot {
    pub fn new(timestamp: DateTime<Utc>, system: SystemMetrics) -> Self {
        Self {
            timestamp,
            system,
            services: BTreeMap::new(),
        }
    }

    pub fn with_service(mut self, name: impl Into<String>, health: ServiceHealth) -> Self {
        self.services.insert(name.into(), health);
        self
    }

    pub fn services_down(&self) -> impl Iterator<Item = &str> {
        self.services
            .iter()
            .filter(|(_, health)| health.status == ServiceStatus::Down)
            .map(|(name, _)| name.as_str())
    }
}

/// Host utilization in percent.
///
/// A metric whose source could not be read is stored as `0` and listed in
/// `unavailable`, so an idle host and a missing source can be told apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<SystemMetric>,
}

impl SystemMetrics {
    pub fn new(cpu_percent: f32, memory_percent: f32, disk_percent: f32) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            disk_percent,
            unavailable: Vec::new(),
        }
    }

    pub fn value(&self, metric: SystemMetric) -> f32 {
        match metric {
            SystemMetric::Cpu => self.cpu_percent,
            SystemMetric::Memory => self.memory_percent,
            SystemMetric::Disk => self.disk_percent,
        }
    }

    pub fn is_available(&self, metric: SystemMetric) -> bool {
        !self.unavailable.contains(&metric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMetric {
    Cpu,
    Memory,
    Disk,
}

impl SystemMetric {
    pub const ALL: [SystemMetric; 3] = [
        SystemMetric::Cpu,
        SystemMetric::Memory,
        SystemMetric::Disk,
    ];
}

impl fmt::Display for SystemMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemMetric::Cpu => "CPU",
            SystemMetric::Memory => "memory",
            SystemMetric::Disk => "disk",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub response_time_ms: u64,
}

impl ServiceHealth {
    pub fn up(response_time_ms: u64) -> Self {
        Self {
            status: ServiceStatus::Up,
            response_time_ms,
        }
    }

    pub fn down() -> Self {
        Self {
            status: ServiceStatus::Down,
            response_time_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Up => f.write_str("up"),
            ServiceStatus::Down => f.write_str("down"),
        }
    }
}
