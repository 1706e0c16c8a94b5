#![allow(clippy::unwrap_used)]
// Integration tests for `FavoritesClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sitefinder_api::{BatchRequest, Error, FavoritesClient, TransportConfig, WireSite};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FavoritesClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let token = SecretString::from("test-token".to_string());
    let client = FavoritesClient::new(base_url, &token, &TransportConfig::default())
        .unwrap()
        .with_retry_delay(Duration::from_millis(20));
    (server, client)
}

fn station_a() -> WireSite {
    WireSite {
        id: None,
        name: "Station A".into(),
        lat: 37.123_456_789,
        lng: 127.987_654_321,
        address: Some("1 Main St".into()),
        opening_hours: None,
    }
}

// ── List ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_favorites_sends_bearer_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/favorites"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "items": [{
                "key": "Station A|37.123457,127.987654",
                "toilet": { "name": "Station A", "lat": "37.123456789", "lng": 127.987654321 },
                "createdAt": "2025-01-01T00:00:00Z",
                "updatedAt": "2025-01-01T00:00:00Z"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client.list_favorites().await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "Station A|37.123457,127.987654");
    assert_eq!(items[0].toilet.name, "Station A");
    assert_eq!(items[0].created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.list_favorites().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

// ── Batch ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_posts_adds_and_removes() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/favorites/batch"))
        .and(body_json(json!({
            "adds": [{
                "name": "Station A",
                "lat": 37.123_456_789,
                "lng": 127.987_654_321,
                "address": "1 Main St"
            }],
            "removes": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "items": [{
                "key": "Station A|37.123457,127.987654",
                "toilet": { "name": "Station A", "lat": 37.123456789, "lng": 127.987654321 }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = BatchRequest {
        adds: vec![station_a()],
        removes: vec![],
    };
    let items = client.batch(&request).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_batch_success_false_is_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/favorites/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "quota exceeded"
        })))
        .mount(&server)
        .await;

    let result = client.batch(&BatchRequest::default()).await;
    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 200);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/favorites/batch"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.batch(&BatchRequest::default()).await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got: {err:?}");
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_single_server_error_is_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "items": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client.list_favorites().await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/favorites/batch"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.batch(&BatchRequest::default()).await.unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.list_favorites().await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

// ── Ping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ping_treats_any_response_as_reachable() {
    let (server, client) = setup().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_fails_when_unreachable() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    drop(server);

    let client = FavoritesClient::with_client(reqwest::Client::new(), base_url);
    let result = client.ping().await;
    assert!(matches!(result, Err(Error::Transport(_))));
}
