//! AlertEvaluator - threshold checks with per-condition cooldowns
//!
//! ## Re-arm rule
//!
//! ```text
//! breaching && (never fired || now - last_fired > cooldown)  → fire, last_fired = now
//! breaching && now - last_fired <= cooldown                  → suppressed
//! not breaching                                              → state untouched
//! ```
//!
//! The cooldown counts from the moment a condition last fired, not from the
//! moment it stopped breaching, so a condition flapping inside one window
//! fires once. Keys are never dropped implicitly; a service that disappears
//! from the snapshot keeps its entry.
//!
//! Evaluation is a pure function of `(snapshot, state, now)`. Callers own
//! loading and persisting the state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::Thresholds;
use crate::{MetricsSnapshot, SystemMetric};

const SERVICE_DOWN_PREFIX: &str = "service_down:";

/// Stable identifier of one alertable condition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConditionKey {
    CpuHigh,
    MemoryHigh,
    DiskHigh,
    ServiceDown(String),
}

impl ConditionKey {
    pub fn for_metric(metric: SystemMetric) -> Self {
        match metric {
            SystemMetric::Cpu => ConditionKey::CpuHigh,
            SystemMetric::Memory => ConditionKey::MemoryHigh,
            SystemMetric::Disk => ConditionKey::DiskHigh,
        }
    }

    pub fn service_down(name: impl Into<String>) -> Self {
        ConditionKey::ServiceDown(name.into())
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKey::CpuHigh => f.write_str("cpu_high"),
            ConditionKey::MemoryHigh => f.write_str("memory_high"),
            ConditionKey::DiskHigh => f.write_str("disk_high"),
            ConditionKey::ServiceDown(name) => write!(f, "{SERVICE_DOWN_PREFIX}{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConditionKey(String);

impl fmt::Display for InvalidConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid condition key: {:?}", self.0)
    }
}

impl std::error::Error for InvalidConditionKey {}

impl FromStr for ConditionKey {
    type Err = InvalidConditionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu_high" => Ok(ConditionKey::CpuHigh),
            "memory_high" => Ok(ConditionKey::MemoryHigh),
            "disk_high" => Ok(ConditionKey::DiskHigh),
            _ => match s.strip_prefix(SERVICE_DOWN_PREFIX) {
                Some(name) if !name.is_empty() => Ok(ConditionKey::ServiceDown(name.to_string())),
                _ => Err(InvalidConditionKey(s.to_string())),
            },
        }
    }
}

impl From<ConditionKey> for String {
    fn from(key: ConditionKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ConditionKey {
    type Error = InvalidConditionKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// When each condition last caused a dispatched notification
///
/// An absent key means the condition never fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    #[serde(default)]
    pub last_fired: BTreeMap<ConditionKey, DateTime<Utc>>,
}

impl AlertState {
    pub fn last_fired(&self, key: &ConditionKey) -> Option<DateTime<Utc>> {
        self.last_fired.get(key).copied()
    }

    /// Whether `key` may fire at `now`. Elapsed time must strictly exceed the cooldown.
    pub fn is_armed(&self, key: &ConditionKey, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        match self.last_fired(key) {
            None => true,
            Some(last) => now.signed_duration_since(last) > cooldown,
        }
    }

    /// First instant after which `key` may fire again, if it is cooling down at `now`.
    pub fn rearms_after(
        &self,
        key: &ConditionKey,
        now: DateTime<Utc>,
        cooldown: TimeDelta,
    ) -> Option<DateTime<Utc>> {
        let last = self.last_fired(key)?;
        let rearm = last.checked_add_signed(cooldown)?;
        (now <= rearm).then_some(rearm)
    }

    pub fn record(&mut self, key: ConditionKey, now: DateTime<Utc>) {
        self.last_fired.insert(key, now);
    }

    /// Administrative cleanup of a single key
    pub fn remove(&mut self, key: &ConditionKey) -> bool {
        self.last_fired.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.last_fired.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

/// A condition that crossed its threshold and was not cooling down
#[derive(Debug, Clone, PartialEq)]
pub struct FiredAlert {
    pub key: ConditionKey,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub fired: Vec<FiredAlert>,
    pub state: AlertState,
}

impl Evaluation {
    pub fn fired_keys(&self) -> Vec<&ConditionKey> {
        self.fired.iter().map(|alert| &alert.key).collect()
    }
}

#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: Thresholds,
    cooldown: TimeDelta,
}

impl AlertEvaluator {
    pub fn new(thresholds: Thresholds, cooldown_secs: u64) -> Self {
        let cooldown_secs = i64::try_from(cooldown_secs).unwrap_or(i64::MAX / 1_000);
        Self {
            thresholds,
            cooldown: TimeDelta::try_seconds(cooldown_secs).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn threshold(&self, metric: SystemMetric) -> f32 {
        match metric {
            SystemMetric::Cpu => self.thresholds.cpu_high,
            SystemMetric::Memory => self.thresholds.memory_high,
            SystemMetric::Disk => self.thresholds.disk_high,
        }
    }

    /// Every condition currently over its threshold, regardless of cooldown.
    pub fn breaching(&self, snapshot: &MetricsSnapshot) -> Vec<ConditionKey> {
        let metrics = SystemMetric::ALL
            .into_iter()
            .filter(|metric| self.metric_breaches(snapshot, *metric))
            .map(ConditionKey::for_metric);

        let services = snapshot.services_down().map(ConditionKey::service_down);

        metrics.chain(services).collect()
    }

    /// Decide which conditions fire at `now` and return the updated state.
    pub fn evaluate(
        &self,
        snapshot: &MetricsSnapshot,
        mut state: AlertState,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let mut fired = Vec::new();

        for metric in SystemMetric::ALL {
            if !self.metric_breaches(snapshot, metric) {
                continue;
            }

            let key = ConditionKey::for_metric(metric);
            let value = snapshot.system.value(metric);
            let threshold = self.threshold(metric);

            if !state.is_armed(&key, now, self.cooldown) {
                trace!("{key}: {value:.1}% > {threshold}% but cooling down");
                continue;
            }

            debug!("{key}: {value:.1}% exceeds {threshold}%");
            state.record(key.clone(), now);
            fired.push(FiredAlert {
                key,
                title: metric_title(metric),
                message: format!(
                    "{} usage is {value:.1}% (threshold: {threshold}%)",
                    capitalized(metric)
                ),
            });
        }

        for name in snapshot.services_down() {
            let key = ConditionKey::service_down(name);

            if !state.is_armed(&key, now, self.cooldown) {
                trace!("{key}: still down, cooling down");
                continue;
            }

            debug!("{key}: service is down");
            state.record(key.clone(), now);
            fired.push(FiredAlert {
                key,
                title: "Service Down".to_string(),
                message: format!("Service {name} is not responding to health checks"),
            });
        }

        Evaluation { fired, state }
    }

    fn metric_breaches(&self, snapshot: &MetricsSnapshot, metric: SystemMetric) -> bool {
        snapshot.system.is_available(metric)
            && snapshot.system.value(metric) > self.threshold(metric)
    }
}

fn metric_title(metric: SystemMetric) -> String {
    format!("High {} Usage", capitalized(metric))
}

fn capitalized(metric: SystemMetric) -> &'static str {
    match metric {
        SystemMetric::Cpu => "CPU",
        SystemMetric::Memory => "Memory",
        SystemMetric::Disk => "Disk",
    }
}
