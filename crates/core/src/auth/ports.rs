//! Port interfaces for credential persistence and the device-code flow

use async_trait::async_trait;
use refsync_domain::{Credential, DeviceCode, Result};

/// Durable storage for the single process-wide credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential.
    ///
    /// A missing or malformed record yields `Ok(None)`; only storage
    /// failures unrelated to the record's content are errors.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Replace any stored record. Must be atomic with respect to crashes.
    async fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove the stored record. Clearing an absent record succeeds.
    async fn clear(&self) -> Result<()>;
}

/// Result of one token-exchange poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The user has not finished signing in yet.
    Pending,
    /// The provider asked for a longer polling interval.
    SlowDown,
    Granted(Credential),
    /// Terminal provider error (declined, expired, bad code).
    Denied(String),
}

/// Identity-provider side of the device-code flow.
#[async_trait]
pub trait DeviceFlowClient: Send + Sync {
    async fn request_device_code(&self, scopes: &[String]) -> Result<DeviceCode>;

    async fn poll_token(&self, code: &DeviceCode) -> Result<PollOutcome>;
}

/// Shows the verification URL and user code.
///
/// Side effects are best-effort; implementations log and swallow their own
/// failures.
pub trait VerificationPresenter: Send + Sync {
    fn present(&self, code: &DeviceCode);
}
