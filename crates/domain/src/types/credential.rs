//! Bearer credentials and device-code grants

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_DEVICE_CODE_EXPIRES_SECS, DEFAULT_POLL_INTERVAL_SECS};
use crate::{RefSyncError, Result};

/// Bearer credential plus the provider's raw token response.
///
/// The raw response is what gets persisted, verbatim, so fields the client
/// does not interpret (refresh token, scopes, expiry) survive a round trip
/// through the credential file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Credential {
    access_token: String,
    raw: Value,
}

impl Credential {
    /// Build a credential from a token-endpoint response.
    ///
    /// # Errors
    /// Returns `RefSyncError::InvalidInput` if the response has no string
    /// `access_token` field.
    pub fn from_token_response(raw: Value) -> Result<Self> {
        let access_token = raw
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RefSyncError::InvalidInput("token response has no access_token".to_string())
            })?
            .to_string();
        Ok(Self { access_token, raw })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// A credential is usable when it carries a non-empty token.
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Value for the outer `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl TryFrom<Value> for Credential {
    type Error = RefSyncError;

    fn try_from(raw: Value) -> Result<Self> {
        Self::from_token_response(raw)
    }
}

impl From<Credential> for Value {
    fn from(credential: Credential) -> Self {
        credential.raw
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_len", &self.access_token.len())
            .finish()
    }
}

/// Device-code grant issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Human-readable instructions composed by the provider.
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

const fn default_expires_in() -> u64 {
    DEFAULT_DEVICE_CODE_EXPIRES_SECS
}

const fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl DeviceCode {
    /// Instructions to show the user; falls back to a generated line when the
    /// provider sent no message.
    pub fn instructions(&self) -> String {
        if self.message.trim().is_empty() {
            format!("To sign in, open {} and enter the code {}", self.verification_uri, self.user_code)
        } else {
            self.message.clone()
        }
    }
}
