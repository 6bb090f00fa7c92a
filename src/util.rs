use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::config::{Alert, Config, Webhook};

const MONITOR_INTERVAL: &str = "MONITOR_INTERVAL";

const MONITOR_COOLDOWN: &str = "MONITOR_COOLDOWN";

const MONITOR_RETENTION_DAYS: &str = "MONITOR_RETENTION_DAYS";

const MONITOR_STATE_DIR: &str = "MONITOR_STATE_DIR";

const MONITOR_WEBHOOK_URL: &str = "MONITOR_WEBHOOK_URL";

/// Apply `MONITOR_*` environment variables on top of a loaded configuration.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an injectable variable lookup.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(interval) = parsed(&lookup, MONITOR_INTERVAL) {
        config.interval = interval;
    }

    if let Some(cooldown) = parsed(&lookup, MONITOR_COOLDOWN) {
        config.cooldown = cooldown;
    }

    if let Some(days) = parsed(&lookup, MONITOR_RETENTION_DAYS) {
        config.retention_days = days;
    }

    if let Some(dir) = lookup(MONITOR_STATE_DIR).filter(|dir| !dir.is_empty()) {
        config.state_dir = PathBuf::from(dir);
    }

    if let Some(url) = lookup(MONITOR_WEBHOOK_URL).filter(|url| !url.is_empty()) {
        config.alert = Some(Alert::Webhook(Webhook { url }));
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparseable {key}={raw}");
            None
        }
    }
}
