//! End-to-end tests for `RefSyncClient` against mock identity and batch
//! endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use refsync_core::VerificationPresenter;
use refsync_domain::{Config, DeviceCode, LogicalRequest, ShareMode};
use refsync_infra::RefSyncClient;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct SilentPresenter;

impl VerificationPresenter for SilentPresenter {
    fn present(&self, _code: &DeviceCode) {}
}

fn config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.auth.client_id = "client-e2e".into();
    config.auth.authority = format!("{}/consumers", server.uri());
    config.auth.credential_path = dir.path().join("token.json");
    config.graph.base_url = format!("{}/v1.0", server.uri());
    config.retry.default_retry_after_secs = 0;
    config
}

async fn client(config: &Config) -> RefSyncClient {
    RefSyncClient::with_presenter(config, Arc::new(SilentPresenter)).await.expect("client")
}

fn seed_credential(path: &Path, token: &str) {
    let raw = json!({"token_type": "Bearer", "access_token": token, "expires_in": 3600});
    std::fs::write(path, serde_json::to_vec(&raw).unwrap()).unwrap();
}

fn stored_token(path: &Path) -> String {
    let raw: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    raw["access_token"].as_str().unwrap().to_string()
}

async fn mount_device_flow(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "dev-code",
            "user_code": "USER-CODE",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 60,
            "interval": 0,
            "message": "sign in"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/consumers/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": token,
            "expires_in": 3600
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Validates `RefSyncClient::share_files` behavior for the first-run
/// scenario.
///
/// Assertions:
/// - The device flow runs once and its token is persisted.
/// - Paths inside the root get links in input order.
/// - A path outside the root fails locally without a request.
/// - Embed links are rewritten to download links.
#[tokio::test]
async fn share_files_authorizes_then_returns_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_device_flow(&server, "fresh-token").await;

    Mock::given(method("POST"))
        .and(path("/v1.0/$batch"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [
                {"id": "2", "status": 201, "body": {"link": {"webUrl": "https://onedrive.live.com/embed?resid=C"}}},
                {"id": "1", "status": 201, "body": {"link": {"webUrl": "https://onedrive.live.com/embed?resid=A"}}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, &dir);
    let client = client(&config).await;
    let root = PathBuf::from("/drive");
    let paths = vec![
        root.join("papers/a.pdf"),
        PathBuf::from("/elsewhere/b.pdf"),
        root.join("papers/c d.pdf"),
    ];

    let links = client.share_files(&root, &paths, ShareMode::Embed).await.unwrap();

    assert_eq!(links.len(), 3);
    assert_eq!(links[0].1.as_deref(), Ok("https://onedrive.live.com/download?resid=A"));
    assert!(links[1].1.is_err());
    assert_eq!(links[2].1.as_deref(), Ok("https://onedrive.live.com/download?resid=C"));
    assert_eq!(links[2].0, paths[2]);
    assert_eq!(stored_token(&config.auth.credential_path), "fresh-token");
}

/// Validates the expired stored credential scenario.
///
/// Assertions:
/// - The stale token is rejected with `InvalidAuthenticationToken`.
/// - A new device flow runs and the retry succeeds with the new token.
/// - The credential file now holds the new token.
#[tokio::test]
async fn expired_stored_credential_is_replaced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    seed_credential(&config.auth.credential_path, "stale-token");
    mount_device_flow(&server, "fresh-token").await;

    Mock::given(method("POST"))
        .and(path("/v1.0/$batch"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [{"id": "1", "status": 401, "body": {"error": {
                "code": "InvalidAuthenticationToken",
                "message": "Access token has expired."
            }}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1.0/$batch"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [{"id": "1", "status": 200, "body": {"webUrl": "https://onedrive.live.com/?id=A"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&config).await;
    let links = client.get_metadata(Path::new("/drive"), &[PathBuf::from("/drive/a.pdf")]).await.unwrap();

    assert_eq!(links[0].1.as_deref(), Ok("https://onedrive.live.com/?id=A"));
    assert_eq!(stored_token(&config.auth.credential_path), "fresh-token");
}

/// Validates the throttled sub-request scenario.
///
/// Assertions:
/// - Only the throttled request is resent.
/// - Both requests end successfully.
#[tokio::test]
async fn throttled_request_is_resent_alone() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    seed_credential(&config.auth.credential_path, "cached-token");

    Mock::given(method("POST"))
        .and(path("/v1.0/$batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [
                {"id": "1", "status": 200, "body": {"n": 1}},
                {"id": "2", "status": 429, "headers": {"Retry-After": "0"}, "body": {"error": {
                    "code": "TooManyRequests", "message": "slow down"
                }}}
            ]
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1.0/$batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [{"id": "1", "status": 200, "body": {"n": 2}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&config).await;
    let requests = vec![LogicalRequest::get("first", "/me/drive/items/1"), LogicalRequest::get("second", "/me/drive/items/2")];
    let results = client.send(&requests).await.unwrap();

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(results[0].request_id.as_str(), "first");
    assert_eq!(results[1].body, Some(json!({"n": 2})));

    let received = server.received_requests().await.unwrap();
    let second_round: Value = serde_json::from_slice(&received[1].body).unwrap();
    assert_eq!(second_round["requests"].as_array().unwrap().len(), 1);
    assert_eq!(second_round["requests"][0]["url"], "/me/drive/items/2");
}

#[tokio::test]
async fn library_requires_configuration() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&server, &dir);

    assert!(client(&config).await.library().is_err());

    config.library.library_id = "42".into();
    assert!(client(&config).await.library().is_ok());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&server, &dir);
    config.auth.client_id.clear();

    let result = RefSyncClient::with_presenter(&config, Arc::new(SilentPresenter)).await;
    assert!(result.is_err());
}
