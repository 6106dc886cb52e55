//! Authentication errors

use refsync_domain::RefSyncError;
use thiserror::Error;

/// Failures while obtaining or discarding a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The device flow could not produce a credential (denied, expired,
    /// or the token exchange failed).
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Device code request failed: {0}")]
    DeviceCodeRequest(String),

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Authorization cancelled")]
    Cancelled,
}

impl From<AuthError> for RefSyncError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Cancelled => Self::Cancelled,
            AuthError::Store(msg) => Self::Storage(msg),
            other => Self::Auth(other.to_string()),
        }
    }
}
