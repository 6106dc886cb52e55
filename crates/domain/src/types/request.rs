//! Caller-supplied logical requests

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-assigned identity correlating a request with the caller's own
/// object (a library item key, a file path). Independent of batch position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// HTTP method of a sub-request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

crate::impl_wire_name_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

/// One desired server operation. Immutable once submitted.
///
/// `url` is relative to the batch endpoint's API root, e.g.
/// `/me/drive/root:/papers/a.pdf:/createLink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalRequest {
    pub id: RequestId,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl LogicalRequest {
    pub fn new(id: impl Into<RequestId>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self { id: id.into(), method, url: url.into(), headers: BTreeMap::new(), body: None }
    }

    pub fn get(id: impl Into<RequestId>, url: impl Into<String>) -> Self {
        Self::new(id, HttpMethod::Get, url)
    }

    pub fn post(id: impl Into<RequestId>, url: impl Into<String>, body: Value) -> Self {
        Self::new(id, HttpMethod::Post, url).with_json_body(body)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a JSON body. The batch endpoint rejects bodies without an
    /// explicit content type, so one is added when absent.
    #[must_use]
    pub fn with_json_body(mut self, body: Value) -> Self {
        if !self.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            self.headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        self.body = Some(body);
        self
    }
}
