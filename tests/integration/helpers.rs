//! Helper functions for integration tests

use chrono::{DateTime, Utc};
use stack_monitor::config::{Config, ServiceConfig, Thresholds};
use stack_monitor::{MetricsSnapshot, ServiceHealth, SystemMetrics};
use url::Url;
use wiremock::MockServer;

/// Fixed base time so tests never depend on the wall clock
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_760_000_000 + secs, 0).unwrap()
}

pub fn snapshot(secs: i64, cpu: f32, memory: f32, disk: f32) -> MetricsSnapshot {
    MetricsSnapshot::new(at(secs), SystemMetrics::new(cpu, memory, disk))
}

pub fn snapshot_with_services(secs: i64, services: &[(&str, bool)]) -> MetricsSnapshot {
    services
        .iter()
        .fold(snapshot(secs, 10.0, 10.0, 10.0), |snap, (name, up)| {
            let health = if *up {
                ServiceHealth::up(25)
            } else {
                ServiceHealth::down()
            };
            snap.with_service(*name, health)
        })
}

/// Service pointing at a wiremock server
pub fn service_for(server: &MockServer, name: &str, path: &str) -> ServiceConfig {
    let uri = Url::parse(&server.uri()).unwrap();
    let mut service = ServiceConfig::new(name, uri.port().unwrap(), path);
    service.host = uri.host_str().unwrap().to_string();
    service
}

/// Config with system thresholds at 100% so only services can alert
pub fn services_only_config(services: Vec<ServiceConfig>) -> Config {
    Config {
        interval: 1,
        thresholds: Thresholds {
            cpu_high: 100.0,
            memory_high: 100.0,
            disk_high: 100.0,
        },
        services,
        ..Config::default()
    }
}
