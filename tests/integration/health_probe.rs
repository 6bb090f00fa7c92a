//! HealthProbe against a mock HTTP server

use std::time::Duration;

use stack_monitor::ServiceStatus;
use stack_monitor::monitors::HealthProbe;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::service_for;

#[tokio::test]
async fn test_probe_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let probe = HealthProbe::new().unwrap();
    let health = probe.probe(&service_for(&mock_server, "n8n", "/healthz")).await;

    assert_eq!(health.status, ServiceStatus::Up);
    assert!(health.response_time_ms < 5_000);
}

#[tokio::test]
async fn test_probe_server_error_is_down() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let probe = HealthProbe::new().unwrap();
    let health = probe.probe(&service_for(&mock_server, "ollama", "/health")).await;

    assert_eq!(health.status, ServiceStatus::Down);
    assert_eq!(health.response_time_ms, 0);
}

#[tokio::test]
async fn test_probe_not_found_is_down() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let probe = HealthProbe::new().unwrap();
    let health = probe.probe(&service_for(&mock_server, "qdrant", "/health")).await;

    assert_eq!(health.status, ServiceStatus::Down);
}

#[tokio::test]
async fn test_probe_timeout_is_down() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let probe = HealthProbe::with_timeout(Duration::from_millis(200)).unwrap();
    let health = probe.probe(&service_for(&mock_server, "crawl4ai", "/health")).await;

    assert_eq!(health.status, ServiceStatus::Down);
    assert_eq!(health.response_time_ms, 0);
}

#[tokio::test]
async fn test_probe_all_reports_every_service() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let services = vec![
        service_for(&mock_server, "web-interface", "/up"),
        service_for(&mock_server, "postgres", "/down"),
    ];

    let probe = HealthProbe::new().unwrap();
    let results = probe.probe_all(&services).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results["web-interface"].status, ServiceStatus::Up);
    assert_eq!(results["postgres"].status, ServiceStatus::Down);
}
