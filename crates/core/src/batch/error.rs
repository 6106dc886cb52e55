//! Errors that abort a whole dispatch or send

use refsync_domain::RefSyncError;
use thiserror::Error;

use crate::auth::AuthError;

/// The only failures that escape `send`. Per-request failures are values in
/// the returned results, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error(transparent)]
    Authorization(#[from] AuthError),

    #[error("Batch send cancelled")]
    Cancelled,
}

impl From<BatchError> for RefSyncError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Authorization(auth) => auth.into(),
            BatchError::Cancelled => Self::Cancelled,
        }
    }
}
