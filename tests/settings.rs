//! Integration tests for the settings collaborator using wiremock.

use chatstream::options::ClientOptions;
use chatstream::settings::{Settings, SettingsClient};
use chatstream::ClientError;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SettingsClient {
    SettingsClient::new(
        &ClientOptions::new(server.uri()),
        format!("{}/api/settings", server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn fetch_returns_settings_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "settings": {"model": "gpt-4o", "autoRun": false}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let settings = client(&mock_server).fetch().await.unwrap();
    assert_eq!(settings.get("model"), Some(&json!("gpt-4o")));
    assert_eq!(settings.get("autoRun"), Some(&json!(false)));
}

#[tokio::test]
async fn save_posts_settings_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .and(body_json(json!({"settings": {"theme": "dark"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut settings = Settings::new();
    settings.insert("theme".to_string(), json!("dark"));
    client(&mock_server).save(&settings).await.unwrap();
}

#[tokio::test]
async fn save_surfaces_success_false() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "Settings are read-only"})),
        )
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .save(&Settings::new())
        .await
        .unwrap_err();
    match err {
        ClientError::Api(message) => assert_eq!(message, "Settings are read-only"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn fetch_surfaces_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no settings"})))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).fetch().await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "no settings");
        }
        other => panic!("unexpected error {:?}", other),
    }
}
