//! Microsoft identity platform device-code flow

use async_trait::async_trait;
use refsync_core::{DeviceFlowClient, PollOutcome};
use refsync_domain::constants::DEVICE_CODE_GRANT_TYPE;
use refsync_domain::{Credential, DeviceCode, RefSyncError, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Device-code client against `{authority}/oauth2/v2.0/*`.
#[derive(Clone)]
pub struct MicrosoftDeviceFlowClient {
    http: HttpClient,
    authority: String,
    client_id: String,
}

impl MicrosoftDeviceFlowClient {
    pub fn new(http: HttpClient, authority: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http,
            authority: authority.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/oauth2/v2.0/{name}", self.authority)
    }
}

#[async_trait]
impl DeviceFlowClient for MicrosoftDeviceFlowClient {
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn request_device_code(&self, scopes: &[String]) -> Result<DeviceCode> {
        let scope = scopes.join(" ");
        let params = [("client_id", self.client_id.as_str()), ("scope", scope.as_str())];
        let builder = self.http.request(Method::POST, self.endpoint("devicecode")).form(&params);

        let response = self.http.send(builder).await?;
        let status = response.status();
        let text = response.text().await.map_err(InfraError::from)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ProviderErrorBody>(&text)
                .map(|body| format!("{}: {}", body.error, body.error_description))
                .unwrap_or(text);
            return Err(RefSyncError::Auth(format!("device code request failed ({status}): {detail}")));
        }

        let code: DeviceCode = serde_json::from_str(&text).map_err(InfraError::from)?;
        debug!(expires_in = code.expires_in, interval = code.interval, "Device code issued");
        Ok(code)
    }

    async fn poll_token(&self, code: &DeviceCode) -> Result<PollOutcome> {
        let params = [
            ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ("client_id", self.client_id.as_str()),
            ("device_code", code.device_code.as_str()),
        ];
        let builder = self.http.request(Method::POST, self.endpoint("token")).form(&params);

        let response = self.http.send(builder).await?;
        let status = response.status();
        let text = response.text().await.map_err(InfraError::from)?;

        if status.is_success() {
            let raw: Value = serde_json::from_str(&text).map_err(InfraError::from)?;
            return Credential::from_token_response(raw).map(PollOutcome::Granted);
        }

        match serde_json::from_str::<ProviderErrorBody>(&text) {
            Ok(body) => Ok(match body.error.as_str() {
                "authorization_pending" => PollOutcome::Pending,
                "slow_down" => PollOutcome::SlowDown,
                _ => PollOutcome::Denied(format!("{}: {}", body.error, body.error_description)),
            }),
            Err(_) => Err(RefSyncError::Auth(format!("token endpoint returned {status}: {text}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> MicrosoftDeviceFlowClient {
        let http = HttpClient::builder().max_attempts(1).build().unwrap();
        MicrosoftDeviceFlowClient::new(http, format!("{}/common/", server.uri()), "client-123")
    }

    fn device_code() -> DeviceCode {
        DeviceCode {
            device_code: "dev-code".into(),
            user_code: "ABCD-EFGH".into(),
            verification_uri: "https://microsoft.com/devicelogin".into(),
            message: String::new(),
            expires_in: 900,
            interval: 5,
        }
    }

    /// Validates `MicrosoftDeviceFlowClient::request_device_code` behavior for
    /// the issued code scenario.
    ///
    /// Assertions:
    /// - The form carries the client id and space-joined scopes.
    /// - The provider's code, URI and polling interval are returned.
    #[tokio::test]
    async fn request_device_code_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/devicecode"))
            .and(body_string_contains("client_id=client-123"))
            .and(body_string_contains("scope=Files.ReadWrite.All+offline_access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "dev-code",
                "user_code": "ABCD-EFGH",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 3,
                "message": "To sign in, use a web browser"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let scopes = vec!["Files.ReadWrite.All".to_string(), "offline_access".to_string()];
        let code = client(&server).request_device_code(&scopes).await.unwrap();

        assert_eq!(code.user_code, "ABCD-EFGH");
        assert_eq!(code.interval, 3);
        assert_eq!(code.message, "To sign in, use a web browser");
    }

    #[tokio::test]
    async fn request_device_code_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/devicecode"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "unknown application"
            })))
            .mount(&server)
            .await;

        let err = client(&server).request_device_code(&["User.Read".to_string()]).await.unwrap_err();

        match err {
            RefSyncError::Auth(message) => assert!(message.contains("invalid_client")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Validates `MicrosoftDeviceFlowClient::poll_token` behavior for each
    /// provider reply.
    ///
    /// Assertions:
    /// - `authorization_pending` maps to `Pending`.
    /// - `slow_down` maps to `SlowDown`.
    /// - Other error codes map to `Denied` with the description.
    #[tokio::test]
    async fn poll_token_maps_error_codes() {
        for (code, expected) in [
            ("authorization_pending", PollOutcome::Pending),
            ("slow_down", PollOutcome::SlowDown),
            ("expired_token", PollOutcome::Denied("expired_token: gone".into())),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/common/oauth2/v2.0/token"))
                .respond_with(
                    ResponseTemplate::new(400)
                        .set_body_json(json!({"error": code, "error_description": "gone"})),
                )
                .mount(&server)
                .await;

            let outcome = client(&server).poll_token(&device_code()).await.unwrap();
            assert_eq!(outcome, expected, "error code {code}");
        }
    }

    #[tokio::test]
    async fn poll_token_returns_granted_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .and(body_string_contains("device_code=dev-code"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "access_token": "granted-token",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).poll_token(&device_code()).await.unwrap();

        match outcome {
            PollOutcome::Granted(credential) => {
                assert_eq!(credential.access_token(), "granted-token");
                assert_eq!(credential.raw()["expires_in"], 3600);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn poll_token_rejects_unparseable_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).poll_token(&device_code()).await.unwrap_err();
        assert!(matches!(err, RefSyncError::Auth(_)));
    }
}
