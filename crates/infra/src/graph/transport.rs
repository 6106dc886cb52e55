//! `POST /$batch` transport
//!
//! Returns every HTTP reply as-is, including 429 and 5xx. Classification and
//! back-off happen in the retry coordinator, so the underlying client must
//! not retry server errors on its own.

use std::collections::BTreeMap;

use async_trait::async_trait;
use refsync_core::{BatchTransport, HttpReply};
use refsync_domain::constants::BATCH_PATH;
use refsync_domain::{BatchRequestBody, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;
use crate::http::HttpClient;

#[derive(Clone)]
pub struct GraphBatchTransport {
    http: HttpClient,
    batch_url: Url,
}

impl GraphBatchTransport {
    /// Build a transport posting to `{base_url}/$batch`.
    ///
    /// # Errors
    /// Returns `RefSyncError::Config` if `base_url` is not a valid URL.
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let batch_url = Url::parse(&base)
            .and_then(|base| base.join(BATCH_PATH))
            .map_err(|err| refsync_domain::RefSyncError::Config(format!("invalid graph base url {base_url}: {err}")))?;
        Ok(Self { http, batch_url })
    }

    pub fn batch_url(&self) -> &Url {
        &self.batch_url
    }
}

#[async_trait]
impl BatchTransport for GraphBatchTransport {
    #[instrument(skip(self, authorization, body), fields(requests = body.requests.len()))]
    async fn post_batch(&self, authorization: &str, body: &BatchRequestBody) -> Result<HttpReply> {
        let builder = self
            .http
            .request(Method::POST, self.batch_url.clone())
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        let response = self.http.send(builder).await?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(InfraError::from)?;

        debug!(status, bytes = body.len(), "Batch reply received");
        Ok(HttpReply { status, headers, body })
    }
}
