//! Daemon loop - sample, evaluate, dispatch, sleep
//!
//! ## State Machine
//!
//! ```text
//! Idle → Sampling → Evaluating → Dispatching → Sleeping ─┬→ Sampling → …
//!                                                        └→ Stopped (shutdown requested)
//! ```
//!
//! Exactly one cycle runs at a time. Shutdown is cooperative: it is only
//! observed in the Sleeping phase, so an in-flight probe always finishes and
//! the alert state of a cycle is written before the next phase starts.
//!
//! Alert state is persisted right after evaluation, before any notification
//! goes out. A crash during dispatch can therefore lose a notification but
//! never repeat one inside its cooldown window.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, SubsecRound, TimeDelta, Utc};
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::MetricsSnapshot;
use crate::alerts::{NotificationDispatcher, Notifier};
use crate::config::{Config, ServiceConfig};
use crate::monitors::{AlertEvaluator, ConditionKey, FiredAlert, HealthProbe, SystemSampler};
use crate::report;
use crate::storage::{AlertStateStore, JsonFileStore, SnapshotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonPhase {
    Idle,
    Sampling,
    Evaluating,
    Dispatching,
    Sleeping,
    Stopped,
}

/// Requests a cooperative shutdown of every listener created with it.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Trigger on Ctrl-C, and on unix also on SIGTERM (`docker stop`, `systemctl stop`).
    ///
    /// The SIGTERM handler is installed before this returns.
    pub fn trigger_on_termination(&self) -> std::io::Result<JoinHandle<()>> {
        #[cfg(unix)]
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        let shutdown = self.clone();
        Ok(tokio::spawn(async move {
            #[cfg(unix)]
            let received = tokio::select! {
                result = signal::ctrl_c() => result.map(|()| "interrupt"),
                _ = terminate.recv() => Ok("terminate"),
            };
            #[cfg(not(unix))]
            let received = signal::ctrl_c().await.map(|()| "interrupt");

            match received {
                Ok(name) => info!("{name} received, stopping after the current cycle"),
                Err(e) => error!("cannot listen for interrupt: {e}"),
            }
            shutdown.trigger();
        }))
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown was requested (or every signal was dropped).
    pub async fn triggered(&mut self) {
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }
}

/// Outcome of one sampling/evaluation/dispatch cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: MetricsSnapshot,

    /// Every condition over its threshold, including ones cooling down
    pub breaching: Vec<ConditionKey>,

    /// Conditions that fired this cycle
    pub fired: Vec<FiredAlert>,

    /// Number of fired alerts the sink accepted
    pub delivered: usize,

    /// Historical snapshots removed by the daily prune, if it ran
    pub pruned: Option<usize>,

    /// Non-fatal failures (storage writes, prune)
    pub errors: Vec<String>,
}

impl CycleReport {
    pub fn is_healthy(&self) -> bool {
        self.breaching.is_empty() && self.errors.is_empty()
    }
}

pub struct Daemon {
    interval: Duration,
    retention: TimeDelta,
    services: Vec<ServiceConfig>,
    probe: HealthProbe,
    sampler: SystemSampler,
    store: Box<dyn SnapshotStore>,
    state_store: AlertStateStore,
    evaluator: AlertEvaluator,
    notifier: Box<dyn Notifier>,
    phase: DaemonPhase,
    last_timestamp: Option<DateTime<Utc>>,
    last_prune_day: Option<NaiveDate>,
}

impl Daemon {
    /// Build a daemon persisting into `config.state_dir`.
    ///
    /// Fails when the state directory cannot be created or written.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = JsonFileStore::open(&config.state_dir).with_context(|| {
            format!("cannot use state directory {}", config.state_dir.display())
        })?;
        let state_store = AlertStateStore::in_dir(&config.state_dir);
        let notifier = NotificationDispatcher::new(config.alert.clone(), &config.system_label)?;

        Self::new(config, Box::new(store), state_store, Box::new(notifier))
    }

    pub fn new(
        config: &Config,
        store: Box<dyn SnapshotStore>,
        state_store: AlertStateStore,
        notifier: Box<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let last_timestamp = match store.latest() {
            Ok(latest) => latest.map(|snapshot| snapshot.timestamp),
            Err(e) => {
                warn!("cannot read latest snapshot: {e}");
                None
            }
        };

        Ok(Self {
            interval: Duration::from_secs(config.interval),
            retention: TimeDelta::days(i64::from(config.retention_days)),
            services: config.services.clone(),
            probe: HealthProbe::new()?,
            sampler: SystemSampler::new(&config.disk_path),
            store,
            state_store,
            evaluator: AlertEvaluator::new(config.thresholds, config.cooldown),
            notifier,
            phase: DaemonPhase::Idle,
            last_timestamp,
            last_prune_day: None,
        })
    }

    pub fn phase(&self) -> DaemonPhase {
        self.phase
    }

    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    /// Run cycles until `shutdown` is triggered.
    #[instrument(skip_all)]
    pub async fn run(&mut self, mut shutdown: ShutdownListener) {
        info!(
            "starting monitoring daemon: {} services, interval {}s",
            self.services.len(),
            self.interval.as_secs()
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // first tick completes immediately
        ticker.tick().await;

        loop {
            self.run_cycle().await;

            self.phase = DaemonPhase::Sleeping;
            if shutdown.is_triggered() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.triggered() => {
                    debug!("shutdown requested while sleeping");
                    break;
                }
            }
        }

        self.phase = DaemonPhase::Stopped;
        info!("monitoring daemon stopped");
    }

    /// Run exactly one cycle: sample, store, evaluate, persist state, dispatch, prune.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut errors = Vec::new();

        self.phase = DaemonPhase::Sampling;
        let system = self.sampler.sample().await;
        let services = self.probe.probe_all(&self.services).await;
        let timestamp = self.next_timestamp(Utc::now());

        let snapshot = MetricsSnapshot {
            timestamp,
            system,
            services,
        };

        if let Err(e) = self.store.append(&snapshot) {
            error!("failed to store snapshot: {e}");
            errors.push(format!("store snapshot: {e}"));
        }

        self.phase = DaemonPhase::Evaluating;
        let state = self.state_store.load();
        let breaching = self.evaluator.breaching(&snapshot);
        let evaluation = self.evaluator.evaluate(&snapshot, state, snapshot.timestamp);

        if let Err(e) = self.state_store.persist(&evaluation.state) {
            error!("failed to persist alert state: {e}");
            errors.push(format!("persist alert state: {e}"));
        }

        self.phase = DaemonPhase::Dispatching;
        let mut delivered = 0;
        for alert in &evaluation.fired {
            info!("alert {}: {}", alert.key, alert.message);
            if self.notifier.dispatch(&alert.title, &alert.message).await {
                delivered += 1;
            } else {
                warn!("notification for {} was not delivered", alert.key);
            }
        }

        let pruned = self.prune_if_new_day(snapshot.timestamp, &mut errors);

        info!("{}", report::status_line(&snapshot, &breaching));

        CycleReport {
            snapshot,
            breaching,
            fired: evaluation.fired,
            delivered,
            pruned,
            errors,
        }
    }

    /// Timestamps strictly increase relative to the last snapshot this daemon saw,
    /// so every cycle gets its own history record.
    fn next_timestamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => {
                let bumped = last
                    .checked_add_signed(TimeDelta::microseconds(1))
                    .unwrap_or(last);
                warn!("clock is behind the last snapshot ({now} <= {last}), using {bumped}");
                bumped
            }
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }

    fn prune_if_new_day(&mut self, now: DateTime<Utc>, errors: &mut Vec<String>) -> Option<usize> {
        let today = now.date_naive();
        if self.last_prune_day == Some(today) {
            return None;
        }
        self.last_prune_day = Some(today);

        let cutoff = now.checked_sub_signed(self.retention)?;
        match self.store.prune(cutoff) {
            Ok(deleted) => {
                debug!("daily prune removed {deleted} snapshots before {cutoff}");
                Some(deleted)
            }
            Err(e) => {
                error!("daily prune failed: {e}");
                errors.push(format!("prune: {e}"));
                None
            }
        }
    }
}
