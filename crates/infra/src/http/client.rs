//! reqwest wrapper with bounded transport-level retries
//!
//! Retries cover connection failures and timeouts, and optionally 5xx
//! replies. Provider-level throttling (429, `Retry-After`) is left to the
//! caller, which knows how long the server asked it to wait.

use std::time::Duration;

use refsync_domain::RefSyncError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("refsync/", env!("CARGO_PKG_VERSION"));

/// Cap on the back-off doubling exponent.
const MAX_BACKOFF_SHIFT: u32 = 8;

/// Shared HTTP client for the token endpoint, Graph and the Zotero API.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
    retry_server_errors: bool,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default timeout and retry settings.
    ///
    /// # Errors
    /// Returns `RefSyncError::Network` if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, RefSyncError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send `builder`, retrying transport failures up to the configured
    /// attempt count.
    ///
    /// Any HTTP status comes back as `Ok`; only a transport failure on the
    /// last attempt is an error.
    ///
    /// # Errors
    /// - `RefSyncError::Internal` if the body is a stream that cannot be
    ///   replayed
    /// - `RefSyncError::Network` when the last attempt failed in transport
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, RefSyncError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| RefSyncError::Internal("request body is not replayable".into()))?
                .build()
                .map_err(|err| RefSyncError::from(InfraError::from(err)))?;
            let last = attempt >= attempts;
            debug!(attempt, method = %request.method(), url = %request.url(), "HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    if last || !(self.retry_server_errors && status.is_server_error()) {
                        return Ok(response);
                    }
                    debug!(attempt, %status, "server error, retrying");
                }
                Err(err) => {
                    if last || !is_transient(&err) {
                        return Err(InfraError::from(err).into());
                    }
                    debug!(attempt, error = %err, "transport failure, retrying");
                }
            }

            let delay = self.backoff_delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Delay after the `attempt`-th failed try: base, 2x base, 4x base and so
    /// on, capped.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(MAX_BACKOFF_SHIFT)
            .min(MAX_BACKOFF_SHIFT);
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Builder for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    retry_server_errors: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            retry_server_errors: true,
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total tries per request, initial one included. Zero is treated as one.
    #[must_use]
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Whether 5xx replies are retried here. The Graph transport turns this
    /// off because the retry coordinator classifies server errors itself.
    #[must_use]
    pub fn retry_server_errors(mut self, enabled: bool) -> Self {
        self.retry_server_errors = enabled;
        self
    }

    /// # Errors
    /// Returns `RefSyncError::Network` if reqwest cannot build the client.
    pub fn build(self) -> Result<HttpClient, RefSyncError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(|err| RefSyncError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            base_backoff: self.base_backoff,
            retry_server_errors: self.retry_server_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_client(attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(attempts)
            .build()
            .expect("http client")
    }

    #[tokio::test]
    async fn batch_post_sends_user_agent_and_returns_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/$batch"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responses": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client(3);
        let builder = client
            .request(Method::POST, format!("{}/$batch", server.uri()))
            .json(&json!({"requests": []}));
        let response = client.send(builder).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn token_endpoint_gateway_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client(3);
        let builder = client
            .request(Method::POST, format!("{}/oauth2/v2.0/token", server.uri()))
            .form(&[("grant_type", "device_code")]);
        let response = client.send(builder).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn graph_client_passes_server_errors_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "4"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::builder().retry_server_errors(false).build().expect("http client");
        let builder = client.request(Method::POST, format!("{}/$batch", server.uri())).json(&json!({}));
        let response = client.send(builder).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()["retry-after"], "4");
    }

    #[tokio::test]
    async fn unauthorized_reply_is_returned_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client(3);
        let builder = client.request(Method::POST, format!("{}/$batch", server.uri())).json(&json!({}));
        let response = client.send(builder).await.expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refused_connection_becomes_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = fast_client(2);
        let builder = client.request(Method::POST, format!("http://{addr}/$batch")).json(&json!({}));

        match client.send(builder).await {
            Err(RefSyncError::Network(_)) => {}
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let client = HttpClient::builder().base_backoff(Duration::from_millis(100)).build().unwrap();
        assert_eq!(client.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(client.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(client.backoff_delay(40), Duration::from_millis(25_600));
    }
}
