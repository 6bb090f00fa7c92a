//! Full daemon cycles against mock services and a mock webhook sink

use stack_monitor::ServiceStatus;
use stack_monitor::alerts::NotificationDispatcher;
use stack_monitor::config::{Alert, ServiceConfig, Webhook};
use stack_monitor::daemon::{Daemon, DaemonPhase, ShutdownSignal};
use stack_monitor::monitors::ConditionKey;
use stack_monitor::storage::{AlertStateStore, JsonFileStore, MemoryStore, SnapshotStore};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{service_for, services_only_config};

async fn webhook_sink() -> MockServer {
    let sink = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&sink)
        .await;
    sink
}

fn webhook_alert(sink: &MockServer) -> Alert {
    Alert::Webhook(Webhook {
        url: format!("{}/alerts", sink.uri()),
    })
}

#[tokio::test]
async fn test_service_going_down_notifies_once() {
    let service = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&service)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&service)
        .await;
    let sink = webhook_sink().await;

    let dir = tempdir().unwrap();
    let mut config = services_only_config(vec![service_for(&service, "n8n", "/health")]);
    config.alert = Some(webhook_alert(&sink));
    let notifier = NotificationDispatcher::new(config.alert.clone(), "test-stack").unwrap();
    let mut daemon = Daemon::new(
        &config,
        Box::new(MemoryStore::new()),
        AlertStateStore::in_dir(dir.path()),
        Box::new(notifier),
    )
    .unwrap();

    let healthy = daemon.run_cycle().await;
    assert_eq!(healthy.snapshot.services["n8n"].status, ServiceStatus::Up);
    assert!(healthy.fired.is_empty());
    assert!(healthy.is_healthy());

    let down = daemon.run_cycle().await;
    assert_eq!(down.snapshot.services["n8n"].status, ServiceStatus::Down);
    assert_eq!(down.breaching, vec![ConditionKey::service_down("n8n")]);
    assert_eq!(down.fired.len(), 1);
    assert_eq!(down.delivered, 1);

    let still_down = daemon.run_cycle().await;
    assert!(still_down.fired.is_empty());
    assert!(!still_down.is_healthy());

    let requests = sink.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["title"], "Service Down");
    assert_eq!(body["system"], "test-stack");
}

#[tokio::test]
async fn test_failed_delivery_still_starts_cooldown() {
    let dir = tempdir().unwrap();
    let mut config = services_only_config(vec![]);
    let mut dead = ServiceConfig::new("ollama", 9, "/api/tags");
    dead.host = "127.0.0.1".to_string();
    config.services = vec![dead];
    config.alert = Some(Alert::Webhook(Webhook {
        url: "http://127.0.0.1:9/alerts".to_string(),
    }));
    let notifier = NotificationDispatcher::new(config.alert.clone(), "test-stack").unwrap();
    let state_store = AlertStateStore::in_dir(dir.path());
    let mut daemon = Daemon::new(
        &config,
        Box::new(MemoryStore::new()),
        state_store.clone(),
        Box::new(notifier),
    )
    .unwrap();

    let first = daemon.run_cycle().await;
    assert_eq!(first.fired.len(), 1);
    assert_eq!(first.delivered, 0);
    assert!(
        state_store
            .load()
            .last_fired(&ConditionKey::service_down("ollama"))
            .is_some()
    );

    let second = daemon.run_cycle().await;
    assert!(second.fired.is_empty());
}

#[tokio::test]
async fn test_restarted_daemon_respects_persisted_cooldown() {
    let service = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&service)
        .await;
    let sink = webhook_sink().await;

    let dir = tempdir().unwrap();
    let mut config = services_only_config(vec![service_for(&service, "qdrant", "/healthz")]);
    config.state_dir = dir.path().to_path_buf();
    config.alert = Some(webhook_alert(&sink));

    {
        let mut daemon = Daemon::from_config(&config).unwrap();
        assert_eq!(daemon.run_cycle().await.fired.len(), 1);
    }

    let mut restarted = Daemon::from_config(&config).unwrap();
    let cycle = restarted.run_cycle().await;
    assert!(cycle.fired.is_empty());
    assert_eq!(sink.received_requests().await.unwrap().len(), 1);

    let store = JsonFileStore::open(dir.path()).unwrap();
    assert_eq!(store.stats().unwrap().history_count, 2);
    assert_eq!(store.latest().unwrap().unwrap(), cycle.snapshot);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let service = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&service)
        .await;

    let dir = tempdir().unwrap();
    let mut config = services_only_config(vec![service_for(&service, "web-interface", "/")]);
    config.state_dir = dir.path().to_path_buf();
    let mut daemon = Daemon::from_config(&config).unwrap();

    let signal = ShutdownSignal::new();
    let listener = signal.listener();
    let stopper = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
        stopper.trigger();
    });

    daemon.run(listener).await;

    assert_eq!(daemon.phase(), DaemonPhase::Stopped);
    // one cycle immediately, one after the 1s interval
    let cycles = daemon.store().stats().unwrap().history_count;
    assert!((1..=2).contains(&cycles), "unexpected cycle count {cycles}");
}
