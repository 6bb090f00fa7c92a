//! Read-only text renderers for the dashboard and historical reports
//!
//! Renderers never fail: missing data renders as a "no data yet" notice and
//! unavailable metrics render as `n/a`.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::monitors::{AlertEvaluator, AlertState, ConditionKey};
use crate::{MetricsSnapshot, ServiceStatus, SystemMetric, SystemMetrics};

pub const NO_DATA: &str = "No monitoring data yet.";

/// One-line summary of a cycle, used for logging.
pub fn status_line(snapshot: &MetricsSnapshot, breaching: &[ConditionKey]) -> String {
    let up = snapshot
        .services
        .values()
        .filter(|health| health.status == ServiceStatus::Up)
        .count();

    let state = if breaching.is_empty() {
        "healthy".to_string()
    } else {
        let keys: Vec<String> = breaching.iter().map(ToString::to_string).collect();
        format!("alerting [{}]", keys.join(", "))
    };

    format!(
        "{state}: cpu {} memory {} disk {}, services {up}/{} up",
        metric_cell(&snapshot.system, SystemMetric::Cpu),
        metric_cell(&snapshot.system, SystemMetric::Memory),
        metric_cell(&snapshot.system, SystemMetric::Disk),
        snapshot.services.len()
    )
}

/// Current status: latest snapshot plus the cooldown table.
pub fn render_dashboard(
    latest: Option<&MetricsSnapshot>,
    state: &AlertState,
    evaluator: &AlertEvaluator,
    now: DateTime<Utc>,
) -> String {
    let Some(snapshot) = latest else {
        return format!("{NO_DATA}\n");
    };

    let mut out = String::new();
    let _ = writeln!(out, "Monitoring Dashboard");
    let _ = writeln!(out, "====================");
    let _ = writeln!(out, "Last sample: {}", snapshot.timestamp.to_rfc3339());
    let _ = writeln!(out);

    let breaching = evaluator.breaching(snapshot);
    let _ = writeln!(out, "System");
    for metric in SystemMetric::ALL {
        let key = ConditionKey::for_metric(metric);
        let flag = if breaching.contains(&key) {
            "  ALERT"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "  {:<8} {:>7}  (threshold {}%){flag}",
            metric.to_string(),
            metric_cell(&snapshot.system, metric),
            evaluator.threshold(metric)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Services");
    if snapshot.services.is_empty() {
        let _ = writeln!(out, "  (none configured)");
    }
    for (name, health) in &snapshot.services {
        match health.status {
            ServiceStatus::Up => {
                let _ = writeln!(out, "  {name:<20} up    {:>6}ms", health.response_time_ms);
            }
            ServiceStatus::Down => {
                let _ = writeln!(out, "  {name:<20} DOWN");
            }
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Alert cooldowns");
    if state.is_empty() {
        let _ = writeln!(out, "  (no alerts fired yet)");
    }
    for (key, fired_at) in &state.last_fired {
        let status = match state.rearms_after(key, now, evaluator.cooldown()) {
            Some(rearm) => {
                let remaining = rearm.signed_duration_since(now).num_seconds().max(0);
                format!("cooling down, {remaining}s left")
            }
            None => "armed".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<32} last fired {}  {status}",
            key.to_string(),
            fired_at.to_rfc3339()
        );
    }

    out
}

/// Aggregates over a series of snapshots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub samples: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<SystemMetric, MetricSummary>,
    pub services: BTreeMap<String, ServiceSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSummary {
    pub average: f32,
    pub peak: f32,
    /// Samples where the metric was available
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServiceSummary {
    pub checks: usize,
    pub up: usize,
    /// Mean response time of successful checks
    pub average_response_ms: Option<u64>,
}

impl ServiceSummary {
    pub fn uptime_percent(&self) -> f32 {
        if self.checks == 0 {
            return 0.0;
        }
        self.up as f32 / self.checks as f32 * 100.0
    }
}

impl HistorySummary {
    pub fn from_history(history: &[MetricsSnapshot]) -> Self {
        let mut summary = HistorySummary {
            samples: history.len(),
            first: history.iter().map(|s| s.timestamp).min(),
            last: history.iter().map(|s| s.timestamp).max(),
            ..Default::default()
        };

        for metric in SystemMetric::ALL {
            let values: Vec<f32> = history
                .iter()
                .filter(|s| s.system.is_available(metric))
                .map(|s| s.system.value(metric))
                .collect();
            if values.is_empty() {
                continue;
            }
            let total: f32 = values.iter().sum();
            let peak = values.iter().copied().fold(f32::MIN, f32::max);
            summary.metrics.insert(
                metric,
                MetricSummary {
                    average: total / values.len() as f32,
                    peak,
                    samples: values.len(),
                },
            );
        }

        let mut response_totals: BTreeMap<&str, u64> = BTreeMap::new();
        for snapshot in history {
            for (name, health) in &snapshot.services {
                let entry = summary.services.entry(name.clone()).or_default();
                entry.checks += 1;
                if health.status == ServiceStatus::Up {
                    entry.up += 1;
                    *response_totals.entry(name.as_str()).or_default() += health.response_time_ms;
                }
            }
        }
        for (name, entry) in summary.services.iter_mut() {
            if entry.up > 0 {
                let total = response_totals.get(name.as_str()).copied().unwrap_or_default();
                entry.average_response_ms = Some(total / entry.up as u64);
            }
        }

        summary
    }
}

/// Historical report over `history` (newest first, as returned by the store).
pub fn render_report(history: &[MetricsSnapshot]) -> String {
    if history.is_empty() {
        return format!("{NO_DATA}\n");
    }

    let summary = HistorySummary::from_history(history);
    let mut out = String::new();

    let _ = writeln!(out, "Monitoring Report");
    let _ = writeln!(out, "=================");
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        let _ = writeln!(
            out,
            "{} samples from {} to {}",
            summary.samples,
            first.to_rfc3339(),
            last.to_rfc3339()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "System (average / peak)");
    for metric in SystemMetric::ALL {
        match summary.metrics.get(&metric) {
            Some(m) => {
                let _ = writeln!(
                    out,
                    "  {:<8} {:>6.1}% / {:>6.1}%",
                    metric.to_string(),
                    m.average,
                    m.peak
                );
            }
            None => {
                let _ = writeln!(out, "  {:<8}    n/a", metric.to_string());
            }
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Services (uptime / avg response)");
    for (name, service) in &summary.services {
        let response = service
            .average_response_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {name:<20} {:>6.1}% / {response}",
            service.uptime_percent()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Recent samples");
    for snapshot in history {
        let down: Vec<&str> = snapshot.services_down().collect();
        let down = if down.is_empty() {
            String::new()
        } else {
            format!("  down: {}", down.join(", "))
        };
        let _ = writeln!(
            out,
            "  {}  cpu {:>7} mem {:>7} disk {:>7}{down}",
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"),
            metric_cell(&snapshot.system, SystemMetric::Cpu),
            metric_cell(&snapshot.system, SystemMetric::Memory),
            metric_cell(&snapshot.system, SystemMetric::Disk),
        );
    }

    out
}

fn metric_cell(system: &SystemMetrics, metric: SystemMetric) -> String {
    if system.is_available(metric) {
        format!("{:.1}%", system.value(metric))
    } else {
        "n/a".to_string()
    }
}
