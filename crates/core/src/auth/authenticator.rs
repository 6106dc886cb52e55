//! Device-code authenticator
//!
//! Produces a credential either from the store (trusted on read; staleness
//! is discovered by the first real call) or by running the device-code flow
//! and persisting its result.

use std::sync::Arc;
use std::time::Duration;

use refsync_domain::constants::SLOW_DOWN_INCREMENT_SECS;
use refsync_domain::{Credential, DeviceCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::AuthError;
use super::ports::{CredentialStore, DeviceFlowClient, PollOutcome, VerificationPresenter};
use crate::time::Sleeper;

/// Drives the device-code flow against injected ports.
pub struct DeviceAuthenticator {
    store: Arc<dyn CredentialStore>,
    flow: Arc<dyn DeviceFlowClient>,
    presenter: Arc<dyn VerificationPresenter>,
    sleeper: Arc<dyn Sleeper>,
    scopes: Vec<String>,
}

impl DeviceAuthenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        flow: Arc<dyn DeviceFlowClient>,
        presenter: Arc<dyn VerificationPresenter>,
        sleeper: Arc<dyn Sleeper>,
        scopes: Vec<String>,
    ) -> Self {
        Self { store, flow, presenter, sleeper, scopes }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Return the stored credential, or run the device flow when the store
    /// has nothing usable.
    ///
    /// # Errors
    /// See [`Self::acquire`].
    #[instrument(skip_all)]
    pub async fn authorize(&self, cancel: &CancellationToken) -> Result<Credential, AuthError> {
        if let Some(credential) = self.load_stored().await {
            debug!("Using stored credential");
            return Ok(credential);
        }
        self.acquire(cancel).await
    }

    /// Read the store, treating unreadable or unusable records as absent.
    pub async fn load_stored(&self) -> Option<Credential> {
        match self.store.load().await {
            Ok(Some(credential)) if credential.is_usable() => Some(credential),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "Credential store unreadable, treating as empty");
                None
            }
        }
    }

    /// Run the device flow from scratch, ignoring the store, and persist the
    /// result.
    ///
    /// # Errors
    /// - `AuthError::DeviceCodeRequest` if no device code could be issued
    /// - `AuthError::AuthorizationFailed` if the user declined, the code
    ///   expired, or the exchange failed
    /// - `AuthError::Cancelled` if `cancel` fired while waiting
    #[instrument(skip_all, fields(scopes = ?self.scopes))]
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Credential, AuthError> {
        let code = self
            .flow
            .request_device_code(&self.scopes)
            .await
            .map_err(|e| AuthError::DeviceCodeRequest(e.to_string()))?;

        info!(
            verification_uri = %code.verification_uri,
            expires_in = code.expires_in,
            "Device code issued, waiting for user sign-in"
        );
        self.presenter.present(&code);

        let credential = self.poll(&code, cancel).await?;

        if let Err(err) = self.store.save(&credential).await {
            warn!(error = %err, "Failed to persist credential; continuing with in-memory copy");
        }
        info!("Device authorization complete");
        Ok(credential)
    }

    async fn poll(
        &self,
        code: &DeviceCode,
        cancel: &CancellationToken,
    ) -> Result<Credential, AuthError> {
        let mut interval = Duration::from_secs(code.interval.max(1));
        let lifetime = Duration::from_secs(code.expires_in);
        let mut waited = Duration::ZERO;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AuthError::Cancelled),
                () = self.sleeper.sleep(interval) => {}
            }
            waited += interval;
            if waited > lifetime {
                return Err(AuthError::AuthorizationFailed(
                    "device code expired before sign-in completed".to_string(),
                ));
            }

            match self.flow.poll_token(code).await {
                Ok(PollOutcome::Granted(credential)) => return Ok(credential),
                Ok(PollOutcome::Pending) => debug!(waited_secs = waited.as_secs(), "Authorization pending"),
                Ok(PollOutcome::SlowDown) => {
                    interval += Duration::from_secs(SLOW_DOWN_INCREMENT_SECS);
                    debug!(interval_secs = interval.as_secs(), "Provider requested slower polling");
                }
                Ok(PollOutcome::Denied(reason)) => {
                    return Err(AuthError::AuthorizationFailed(reason));
                }
                Err(err) => return Err(AuthError::AuthorizationFailed(err.to_string())),
            }
        }
    }
}
