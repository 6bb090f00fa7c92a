//! Storage persistence tests against a real directory
//!
//! These tests verify that:
//! - Snapshots survive reopening the store
//! - History is newest first and bounded
//! - Pruning keeps the latest snapshot
//! - Alert state persistence is idempotent

use std::fs;

use pretty_assertions::assert_eq;
use stack_monitor::monitors::{AlertState, ConditionKey};
use stack_monitor::storage::{AlertStateStore, JsonFileStore, SnapshotStore, load_history};
use tempfile::tempdir;

use crate::helpers::{at, snapshot};

#[test]
fn test_snapshots_survive_reopen() {
    let dir = tempdir().unwrap();

    {
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.append(&snapshot(0, 10.0, 20.0, 30.0)).unwrap();
        store.append(&snapshot(60, 11.0, 21.0, 31.0)).unwrap();
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    let latest = store.latest().unwrap().unwrap();
    assert_eq!(latest, snapshot(60, 11.0, 21.0, 31.0));

    let stats = store.stats().unwrap();
    assert_eq!(stats.history_count, 2);
    assert_eq!(stats.oldest, Some(at(0)));
    assert_eq!(stats.newest, Some(at(60)));
}

#[test]
fn test_history_newest_first_and_bounded() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();

    for i in 0..5 {
        store.append(&snapshot(i * 60, i as f32, 0.0, 0.0)).unwrap();
    }

    let history = load_history(&store, 3).unwrap();
    let timestamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(240), at(180), at(120)]);

    assert_eq!(load_history(&store, 0).unwrap().len(), 0);
    assert_eq!(load_history(&store, 100).unwrap().len(), 5);
}

#[test]
fn test_load_history_skips_corrupt_records() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.append(&snapshot(0, 1.0, 1.0, 1.0)).unwrap();
    store.append(&snapshot(60, 2.0, 2.0, 2.0)).unwrap();

    let newest = fs::read_dir(dir.path().join("history"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .max()
        .unwrap();
    fs::write(newest, "{ not json").unwrap();

    let history = load_history(&store, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].timestamp, at(0));
}

#[test]
fn test_prune_keeps_latest_and_recent() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    for i in 0..4 {
        store.append(&snapshot(i * 86_400, 5.0, 5.0, 5.0)).unwrap();
    }

    let deleted = store.prune(at(2 * 86_400)).unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(store.stats().unwrap().history_count, 2);
    assert_eq!(store.latest().unwrap().unwrap().timestamp, at(3 * 86_400));

    // nothing older than the cutoff remains, so a second prune is a no-op
    assert_eq!(store.prune(at(2 * 86_400)).unwrap(), 0);
}

#[test]
fn test_open_unwritable_directory_fails() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    assert!(JsonFileStore::open(&blocker).is_err());
}

#[test]
fn test_alert_state_persist_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = AlertStateStore::in_dir(dir.path());

    let mut state = AlertState::default();
    state.record(ConditionKey::CpuHigh, at(0));
    state.record(ConditionKey::service_down("n8n"), at(30));

    store.persist(&state).unwrap();
    let first = fs::read(store.path()).unwrap();
    store.persist(&store.load()).unwrap();
    let second = fs::read(store.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.load(), state);
}

#[test]
fn test_alert_state_file_uses_condition_keys() {
    let dir = tempdir().unwrap();
    let store = AlertStateStore::in_dir(dir.path());

    let mut state = AlertState::default();
    state.record(ConditionKey::service_down("web-interface"), at(0));
    store.persist(&state).unwrap();

    let content = fs::read_to_string(store.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(json["last_fired"]["service_down:web-interface"].is_string());
}

#[test]
fn test_corrupt_alert_state_loads_empty() {
    let dir = tempdir().unwrap();
    let store = AlertStateStore::in_dir(dir.path());
    fs::write(store.path(), "garbage").unwrap();

    assert!(store.load().is_empty());
    assert!(store.try_load().is_err());
}
