//! Batch dispatcher
//!
//! Splits a request list into envelopes of at most `batch_size`, posts them
//! one after another under a single credential, and returns exactly one
//! `SubResult` per request in input order. No retries happen here.

use std::sync::Arc;

use refsync_domain::constants::MAX_BATCH_SIZE;
use refsync_domain::{BatchEnvelope, Credential, LogicalRequest, SubResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::classify::ResponseClassifier;
use super::error::BatchError;
use super::ports::BatchTransport;
use crate::auth::TokenGuard;

/// Results of one dispatch round and the credential they were sent with.
#[derive(Debug, Clone)]
pub struct DispatchRound {
    pub credential: Credential,
    pub results: Vec<SubResult>,
}

pub struct BatchDispatcher {
    transport: Arc<dyn BatchTransport>,
    guard: Arc<TokenGuard>,
    classifier: ResponseClassifier,
    batch_size: usize,
}

impl BatchDispatcher {
    /// Create a dispatcher. `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(
        transport: Arc<dyn BatchTransport>,
        guard: Arc<TokenGuard>,
        classifier: ResponseClassifier,
        batch_size: usize,
    ) -> Self {
        Self { transport, guard, classifier, batch_size: batch_size.clamp(1, MAX_BATCH_SIZE) }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn guard(&self) -> &Arc<TokenGuard> {
        &self.guard
    }

    pub fn classifier(&self) -> &ResponseClassifier {
        &self.classifier
    }

    /// Ensure a credential, then send every request once.
    ///
    /// # Errors
    /// - `BatchError::Authorization` if no credential could be obtained
    /// - `BatchError::Cancelled` if `cancel` fired
    pub async fn dispatch(
        &self,
        requests: &[LogicalRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<SubResult>, BatchError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        self.dispatch_round(requests, cancel).await.map(|round| round.results)
    }

    /// Like [`Self::dispatch`], also returning the credential used so a
    /// caller can invalidate exactly that one on auth failure.
    ///
    /// # Errors
    /// Same as [`Self::dispatch`].
    #[instrument(skip_all, fields(requests = requests.len(), batch_size = self.batch_size))]
    pub async fn dispatch_round(
        &self,
        requests: &[LogicalRequest],
        cancel: &CancellationToken,
    ) -> Result<DispatchRound, BatchError> {
        let credential = self.guard.credential(cancel).await?;
        let results = self.submit(&credential, requests, cancel).await?;
        Ok(DispatchRound { credential, results })
    }

    /// Send `requests` with an explicit credential.
    ///
    /// # Errors
    /// Returns `BatchError::Cancelled` if `cancel` fires between envelopes.
    pub async fn submit(
        &self,
        credential: &Credential,
        requests: &[LogicalRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<SubResult>, BatchError> {
        let authorization = credential.authorization_header();
        let envelopes = BatchEnvelope::pack(requests.len(), self.batch_size);
        let mut slots: Vec<Option<SubResult>> = vec![None; requests.len()];

        for (index, envelope) in envelopes.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(BatchError::Cancelled);
            }

            let body = envelope.to_wire(requests);
            let parsed = match self.transport.post_batch(&authorization, &body).await {
                Ok(reply) => {
                    debug!(envelope = index, size = envelope.len(), status = reply.status, "Envelope sent");
                    self.classifier.parse_envelope(envelope, requests, &reply)
                }
                Err(err) => {
                    warn!(envelope = index, size = envelope.len(), error = %err, "Envelope transport failed");
                    self.classifier.transport_failure(envelope, requests, &err)
                }
            };

            for (position, result) in parsed {
                if let Some(slot) = slots.get_mut(position) {
                    *slot = Some(result);
                }
            }
        }

        Ok(slots
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| self.classifier.missing_response(request.id.clone(), 0))
            })
            .collect())
    }
}
