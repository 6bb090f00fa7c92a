//! NotificationDispatcher against mock webhook and Discord sinks

use stack_monitor::alerts::{NotificationDispatcher, Notifier};
use stack_monitor::config::{Alert, Discord, Webhook};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_webhook_receives_alert_payload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "title": "Service Down",
            "message": "Service n8n is not responding to health checks",
            "system": "n8n-ai-starter-kit",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = Alert::Webhook(Webhook {
        url: format!("{}/hook", mock_server.uri()),
    });
    let dispatcher = NotificationDispatcher::new(Some(sink), "n8n-ai-starter-kit").unwrap();

    let delivered = dispatcher
        .dispatch("Service Down", "Service n8n is not responding to health checks")
        .await;

    assert!(delivered);

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_webhook_error_status_is_not_delivered() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = Alert::Webhook(Webhook {
        url: mock_server.uri(),
    });
    let dispatcher = NotificationDispatcher::new(Some(sink), "kit").unwrap();

    // one attempt only, no retries
    assert!(!dispatcher.dispatch("High CPU Usage", "CPU usage is 95.0%").await);
}

#[tokio::test]
async fn test_unreachable_webhook_is_not_delivered() {
    let sink = Alert::Webhook(Webhook {
        url: "http://127.0.0.1:9/hook".to_string(),
    });
    let dispatcher = NotificationDispatcher::new(Some(sink), "kit").unwrap();

    assert!(!dispatcher.dispatch("High CPU Usage", "CPU usage is 95.0%").await);
}

#[tokio::test]
async fn test_discord_sink_receives_embed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(body_partial_json(serde_json::json!({
            "content": "🚨 High Disk Usage <@1234>",
            "embeds": [{ "description": "Disk usage is 95.0% (threshold: 90%)" }],
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sink = Alert::Discord(Discord {
        url: format!("{}/api/webhooks/1/token", mock_server.uri()),
        user_id: Some("1234".to_string()),
    });
    let dispatcher = NotificationDispatcher::new(Some(sink), "kit").unwrap();

    assert!(
        dispatcher
            .dispatch("High Disk Usage", "Disk usage is 95.0% (threshold: 90%)")
            .await
    );
}
