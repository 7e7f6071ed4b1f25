//! Telegram Bot API Contract Tests
//!
//! These tests verify the exact HTTP requests the Telegram adapter sends and
//! how it interprets responses, against a local mock server.

use motivator::channels::{ChannelAdapter, OutboundMessage, ReplyKeyboard, TelegramAdapter};
use motivator::config::TelegramConfig;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:test";

fn adapter_for(server: &MockServer) -> TelegramAdapter {
    let config = TelegramConfig {
        api_base: server.uri(),
        poll_timeout_secs: 0,
    };
    TelegramAdapter::new(TOKEN, &config)
}

fn ok_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}}))
}

// ────────────────────────────────────────────────────────────────────────────
// sendMessage
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_posts_markdown_message_with_keyboard() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": 42,
            "text": "*Hello*",
            "parse_mode": "Markdown",
            "reply_markup": {
                "keyboard": [[{"text": "Yes"}, {"text": "No"}]],
                "resize_keyboard": true,
                "one_time_keyboard": true
            }
        })))
        .respond_with(ok_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let message = OutboundMessage::text(42, "*Hello*")
        .markdown()
        .with_keyboard(ReplyKeyboard {
            rows: vec![vec!["Yes".to_owned(), "No".to_owned()]],
            one_time: true,
        });
    let result = adapter_for(&mock_server).send(message).await;

    assert!(result.is_ok(), "send should succeed: {result:?}");
}

#[tokio::test]
async fn send_disables_link_previews_when_asked() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({
            "link_preview_options": {"is_disabled": true}
        })))
        .respond_with(ok_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let message = OutboundMessage::text(1, "[link](https://example.com)").without_link_preview();
    assert!(adapter_for(&mock_server).send(message).await.is_ok());
}

#[tokio::test]
async fn send_surfaces_api_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&mock_server)
        .await;

    let err = adapter_for(&mock_server)
        .send(OutboundMessage::text(1, "hi"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("chat not found"), "{err}");
}

#[tokio::test]
async fn send_surfaces_http_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden: bot was blocked"))
        .mount(&mock_server)
        .await;

    let err = adapter_for(&mock_server)
        .send(OutboundMessage::text(1, "hi"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("403"), "{err}");
}

// ────────────────────────────────────────────────────────────────────────────
// getUpdates
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn run_forwards_text_and_advances_offset() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(body_partial_json(json!({"offset": 0, "allowed_updates": ["message"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [{
                "update_id": 5,
                "message": {
                    "message_id": 1,
                    "from": {"id": 99, "is_bot": false, "first_name": "A"},
                    "chat": {"id": 99, "type": "private"},
                    "text": "/start"
                }
            }]
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(body_partial_json(json!({"offset": 6})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "result": []}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock_server)
        .await;

    let adapter = std::sync::Arc::new(adapter_for(&mock_server));
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let runner = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.run(tx).await })
    };

    let inbound = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("message within timeout")
        .expect("channel open");
    assert_eq!(inbound.user_id, 99);
    assert_eq!(inbound.chat_id, 99);
    assert_eq!(inbound.text, "/start");
    assert_eq!(inbound.channel, "telegram");

    // The next poll acknowledges update 5.
    let acknowledged = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let requests = mock_server.received_requests().await.unwrap_or_default();
            let seen = requests.iter().any(|r| {
                serde_json::from_slice::<serde_json::Value>(&r.body)
                    .map(|b| b["offset"] == 6)
                    .unwrap_or(false)
            });
            if seen {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(acknowledged.is_ok(), "offset was not advanced");

    runner.abort();
}

#[tokio::test]
async fn run_fails_on_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    let result = adapter_for(&mock_server).run(tx).await;
    assert!(result.is_err());
}

// ────────────────────────────────────────────────────────────────────────────
// getMe
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_uses_get_me() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getMe")))
        .respond_with(ok_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(adapter_for(&mock_server).health_check().await.unwrap());
}

#[tokio::test]
async fn health_check_with_empty_token_is_false() {
    let config = TelegramConfig::default();
    let adapter = TelegramAdapter::new("  ", &config);
    assert!(!adapter.health_check().await.unwrap());
}
