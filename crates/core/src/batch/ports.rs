//! Port interface for the multiplexed batch endpoint

use std::collections::BTreeMap;

use async_trait::async_trait;
use refsync_domain::{BatchRequestBody, Result};

/// Raw reply to one outer batch call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpReply {
    pub status: u16,
    /// Header names lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Sends one envelope to the batch endpoint.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// POST `body` with the given `Authorization` header value.
    ///
    /// Any HTTP status is a successful reply; `Err` means no response was
    /// received at all (connection, TLS or timeout failure).
    async fn post_batch(&self, authorization: &str, body: &BatchRequestBody) -> Result<HttpReply>;
}
