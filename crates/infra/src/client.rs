//! Assembled client
//!
//! Wires the file store, device flow, presenter, batch transport and sleeper
//! into one [`RetryCoordinator`], and adds share-link helpers on top of it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use refsync_core::sharing::{self, LinkKind};
use refsync_core::{
    BatchDispatcher, BatchError, DeviceAuthenticator, LibraryClient, ResponseClassifier,
    RetryCoordinator, TokenGuard, VerificationPresenter,
};
use refsync_domain::{Config, LogicalRequest, RefSyncError, Result, ShareMode, SubResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::auth::{FileCredentialStore, MicrosoftDeviceFlowClient, SystemPresenter};
use crate::graph::GraphBatchTransport;
use crate::http::HttpClient;
use crate::library::ZoteroClient;
use crate::time::TokioSleeper;

/// Link for one input path, or a readable reason it could not be produced.
pub type LinkResult = std::result::Result<String, String>;

/// Ready-to-use batch client built from a [`Config`].
pub struct RefSyncClient {
    coordinator: RetryCoordinator,
    max_retries: u32,
    library: Option<Arc<dyn LibraryClient>>,
}

impl RefSyncClient {
    /// Build a client that prints the device-code prompt, copies the code
    /// and opens a browser when sign-in is needed.
    ///
    /// # Errors
    /// Returns `RefSyncError::Config` for an invalid configuration and
    /// `RefSyncError::Network` if the HTTP stack cannot be initialised.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::with_presenter(config, Arc::new(SystemPresenter::new())).await
    }

    /// Build a client with a caller-supplied presenter.
    ///
    /// # Errors
    /// See [`Self::from_config`].
    pub async fn with_presenter(
        config: &Config,
        presenter: Arc<dyn VerificationPresenter>,
    ) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_secs(config.graph.request_timeout_secs.max(1));
        let auth_http = HttpClient::builder().timeout(timeout).build()?;
        let graph_http = HttpClient::builder().timeout(timeout).retry_server_errors(false).build()?;

        let sleeper = Arc::new(TokioSleeper);
        let authenticator = Arc::new(DeviceAuthenticator::new(
            Arc::new(FileCredentialStore::new(&config.auth.credential_path)),
            Arc::new(MicrosoftDeviceFlowClient::new(
                auth_http,
                &config.auth.authority,
                &config.auth.client_id,
            )),
            presenter,
            sleeper.clone(),
            config.auth.scopes.clone(),
        ));
        let guard = Arc::new(TokenGuard::initialize(authenticator).await);

        let transport = Arc::new(GraphBatchTransport::new(graph_http, &config.graph.base_url)?);
        let dispatcher = BatchDispatcher::new(
            transport,
            guard,
            ResponseClassifier::from_config(&config.retry),
            config.graph.effective_batch_size(),
        );

        let library = if config.library.library_id.trim().is_empty() {
            None
        } else {
            let http = HttpClient::builder().timeout(timeout).build()?;
            Some(Arc::new(ZoteroClient::from_config(http, &config.library)?) as Arc<dyn LibraryClient>)
        };

        info!(
            batch_size = dispatcher.batch_size(),
            max_retries = config.retry.max_retries,
            library = library.is_some(),
            "RefSync client ready"
        );

        Ok(Self {
            coordinator: RetryCoordinator::new(dispatcher, sleeper),
            max_retries: config.retry.max_retries,
            library,
        })
    }

    pub fn coordinator(&self) -> &RetryCoordinator {
        &self.coordinator
    }

    /// Send with the configured retry budget.
    ///
    /// # Errors
    /// Returns `BatchError::Authorization` when no credential can be
    /// obtained.
    pub async fn send(&self, requests: &[LogicalRequest]) -> std::result::Result<Vec<SubResult>, BatchError> {
        self.coordinator.send(requests, self.max_retries).await
    }

    /// # Errors
    /// As [`Self::send`], plus `BatchError::Cancelled`.
    pub async fn send_with_cancel(
        &self,
        requests: &[LogicalRequest],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<SubResult>, BatchError> {
        self.coordinator.send_with_cancel(requests, self.max_retries, cancel).await
    }

    /// Create a share link for each file under `root`.
    ///
    /// Results are in input order. Paths outside `root` fail locally
    /// without a request.
    ///
    /// # Errors
    /// As [`Self::send`].
    #[instrument(skip(self, root, paths), fields(paths = paths.len(), %mode))]
    pub async fn share_files(
        &self,
        root: &Path,
        paths: &[PathBuf],
        mode: ShareMode,
    ) -> std::result::Result<Vec<(PathBuf, LinkResult)>, BatchError> {
        self.links(root, paths, LinkKind::Share(mode), |id, relative| {
            sharing::share_link_request(id, relative, mode)
        })
        .await
    }

    /// Look up the web URL of each file under `root`.
    ///
    /// # Errors
    /// As [`Self::send`].
    #[instrument(skip(self, root, paths), fields(paths = paths.len()))]
    pub async fn get_metadata(
        &self,
        root: &Path,
        paths: &[PathBuf],
    ) -> std::result::Result<Vec<(PathBuf, LinkResult)>, BatchError> {
        self.links(root, paths, LinkKind::Metadata, |id, relative| sharing::metadata_request(id, relative))
            .await
    }

    async fn links<F>(
        &self,
        root: &Path,
        paths: &[PathBuf],
        kind: LinkKind,
        build: F,
    ) -> std::result::Result<Vec<(PathBuf, LinkResult)>, BatchError>
    where
        F: Fn(String, &str) -> LogicalRequest,
    {
        let mut outcomes: Vec<Option<LinkResult>> = Vec::with_capacity(paths.len());
        let mut requests = Vec::new();
        let mut slots = Vec::new();

        for (index, path) in paths.iter().enumerate() {
            match sharing::relative_cloud_path(root, path) {
                Ok(relative) => {
                    requests.push(build(index.to_string(), &relative));
                    slots.push(index);
                    outcomes.push(None);
                }
                Err(err) => outcomes.push(Some(Err(err.to_string()))),
            }
        }

        let results = self.send(&requests).await?;
        for (slot, result) in slots.into_iter().zip(results) {
            if let Some(outcome) = outcomes.get_mut(slot) {
                *outcome = Some(sharing::extract_link(&result, kind));
            }
        }

        Ok(paths
            .iter()
            .cloned()
            .zip(outcomes)
            .map(|(path, outcome)| (path, outcome.unwrap_or_else(|| Err("no result".to_string()))))
            .collect())
    }

    /// The configured reference library.
    ///
    /// # Errors
    /// Returns `RefSyncError::Config` when no library id is configured.
    pub fn library(&self) -> Result<Arc<dyn LibraryClient>> {
        self.library
            .clone()
            .ok_or_else(|| RefSyncError::Config("library.library_id is not configured".into()))
    }
}
