//! Process-wide credential guard
//!
//! One `TokenGuard` is shared (behind `Arc`) by every component that sends
//! authorized calls. A single async mutex serializes authorize and
//! invalidate so concurrent callers never run two device flows or discard a
//! credential another caller just obtained.

use std::sync::Arc;

use refsync_domain::Credential;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::authenticator::DeviceAuthenticator;
use super::error::AuthError;

#[derive(Debug, Default)]
struct GuardState {
    credential: Option<Credential>,
    /// Set by `invalidate`: the store may still hold the rejected record, so
    /// the next acquisition must skip it.
    store_stale: bool,
}

/// Holds the current credential and knows how to replace it.
pub struct TokenGuard {
    authenticator: Arc<DeviceAuthenticator>,
    state: Mutex<GuardState>,
}

impl TokenGuard {
    pub fn new(authenticator: Arc<DeviceAuthenticator>) -> Self {
        Self { authenticator, state: Mutex::new(GuardState::default()) }
    }

    /// Build a guard pre-loaded from the credential store.
    pub async fn initialize(authenticator: Arc<DeviceAuthenticator>) -> Self {
        let credential = authenticator.load_stored().await;
        debug!(loaded = credential.is_some(), "Token guard initialized");
        Self { authenticator, state: Mutex::new(GuardState { credential, store_stale: false }) }
    }

    /// Whether a usable credential is held in memory right now.
    pub async fn is_usable(&self) -> bool {
        self.state.lock().await.credential.as_ref().is_some_and(Credential::is_usable)
    }

    /// Current credential, acquiring one if none is held.
    ///
    /// Holds the guard lock for the whole acquisition, so a concurrent caller
    /// waits and then reuses the result.
    ///
    /// # Errors
    /// Propagates `AuthError` from the authenticator.
    pub async fn credential(&self, cancel: &CancellationToken) -> Result<Credential, AuthError> {
        let mut state = self.state.lock().await;
        if let Some(credential) = state.credential.as_ref().filter(|c| c.is_usable()) {
            return Ok(credential.clone());
        }

        let credential = if state.store_stale {
            self.authenticator.acquire(cancel).await?
        } else {
            self.authenticator.authorize(cancel).await?
        };
        state.credential = Some(credential.clone());
        state.store_stale = false;
        Ok(credential)
    }

    /// Drop the in-memory credential and clear the store.
    ///
    /// # Errors
    /// Returns `AuthError::Store` if the store could not be cleared. The
    /// in-memory credential is dropped regardless and the next acquisition
    /// skips the store.
    pub async fn invalidate(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        self.invalidate_locked(&mut state).await
    }

    /// Invalidate only if `rejected` is still the held credential.
    ///
    /// Returns `Ok(false)` when another caller already replaced or dropped
    /// it, in which case nothing is cleared.
    ///
    /// # Errors
    /// Same as [`Self::invalidate`].
    pub async fn invalidate_if_current(&self, rejected: &Credential) -> Result<bool, AuthError> {
        let mut state = self.state.lock().await;
        if state.credential.as_ref() != Some(rejected) {
            debug!("Credential already replaced or invalidated, skipping");
            return Ok(false);
        }
        self.invalidate_locked(&mut state).await.map(|()| true)
    }

    async fn invalidate_locked(&self, state: &mut GuardState) -> Result<(), AuthError> {
        state.credential = None;
        state.store_stale = true;
        info!("Credential invalidated");
        self.authenticator.store().clear().await.map_err(|err| {
            warn!(error = %err, "Failed to clear credential store");
            AuthError::Store(err.to_string())
        })
    }
}
