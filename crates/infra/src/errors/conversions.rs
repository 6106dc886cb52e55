//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use refsync_domain::RefSyncError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use toml::de::Error as TomlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RefSyncError);

impl From<InfraError> for RefSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RefSyncError> for InfraError {
    fn from(value: RefSyncError) -> Self {
        InfraError(value)
    }
}

trait IntoRefSyncError {
    fn into_refsync(self) -> RefSyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RefSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRefSyncError for HttpError {
    fn into_refsync(self) -> RefSyncError {
        if self.is_timeout() {
            return RefSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return RefSyncError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return RefSyncError::Serialization(format!("HTTP body decode failed: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => RefSyncError::Auth(message),
                400..=499 if code != 429 => RefSyncError::InvalidInput(message),
                _ => RefSyncError::Network(message),
            };
        }

        RefSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_refsync())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → RefSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRefSyncError for IoError {
    fn into_refsync(self) -> RefSyncError {
        match self.kind() {
            ErrorKind::PermissionDenied => RefSyncError::Storage(format!("permission denied: {self}")),
            ErrorKind::NotFound => RefSyncError::Storage(format!("not found: {self}")),
            _ => RefSyncError::Storage(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_refsync())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml → RefSyncError */
/* -------------------------------------------------------------------------- */

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(RefSyncError::Serialization(format!("invalid JSON: {value}")))
    }
}

impl From<TomlError> for InfraError {
    fn from(value: TomlError) -> Self {
        InfraError(RefSyncError::Config(format!("invalid TOML: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
