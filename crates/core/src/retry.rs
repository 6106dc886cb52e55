//! Retry coordinator
//!
//! Public entry point for batched sends. Runs at most `max_retries + 1`
//! dispatch rounds; each round resends only the requests whose last result
//! was transient (auth expired or rate limited).

use std::sync::Arc;
use std::time::Duration;

use refsync_domain::{LogicalRequest, RetryState, SubResult, TransientCause};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::batch::{BatchDispatcher, BatchError};
use crate::time::Sleeper;

pub struct RetryCoordinator {
    dispatcher: BatchDispatcher,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryCoordinator {
    pub fn new(dispatcher: BatchDispatcher, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { dispatcher, sleeper }
    }

    pub fn dispatcher(&self) -> &BatchDispatcher {
        &self.dispatcher
    }

    /// Send `requests`, retrying transient failures up to `max_retries`
    /// times.
    ///
    /// # Returns
    /// One `SubResult` per request, in input order. Partial failure is not an
    /// error; requests still transient when the budget runs out come back as
    /// `RetryBudgetExhausted` failures.
    ///
    /// # Errors
    /// Returns `BatchError::Authorization` when no credential can be
    /// obtained at all.
    pub async fn send(
        &self,
        requests: &[LogicalRequest],
        max_retries: u32,
    ) -> Result<Vec<SubResult>, BatchError> {
        self.send_with_cancel(requests, max_retries, &CancellationToken::new()).await
    }

    /// [`Self::send`] with a caller-supplied cancellation token covering the
    /// device-flow wait and every back-off sleep.
    ///
    /// # Errors
    /// As [`Self::send`], plus `BatchError::Cancelled`.
    #[instrument(skip_all, fields(requests = requests.len(), max_retries))]
    pub async fn send_with_cancel(
        &self,
        requests: &[LogicalRequest],
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<SubResult>, BatchError> {
        let mut finals: Vec<Option<SubResult>> = vec![None; requests.len()];
        let mut working: Vec<usize> = (0..requests.len()).collect();
        let mut state = RetryState::new(max_retries);

        while !working.is_empty() {
            let batch: Vec<LogicalRequest> =
                working.iter().filter_map(|&i| requests.get(i).cloned()).collect();
            let round = self.dispatcher.dispatch_round(&batch, cancel).await?;

            let mut retryable = Vec::new();
            let mut auth_expired = false;
            let mut wait: Option<Duration> = None;
            let mut succeeded = 0usize;

            for (&original, result) in working.iter().zip(round.results) {
                match result.transient_cause() {
                    Some(TransientCause::AuthExpired) => {
                        auth_expired = true;
                        retryable.push(original);
                    }
                    Some(TransientCause::RateLimited { retry_after }) => {
                        wait = Some(wait.map_or(retry_after, |w| w.max(retry_after)));
                        retryable.push(original);
                    }
                    None if result.is_ok() => succeeded += 1,
                    None => {}
                }
                if let Some(slot) = finals.get_mut(original) {
                    *slot = Some(result);
                }
            }

            info!(
                round = state.round(),
                sent = working.len(),
                succeeded,
                retryable = retryable.len(),
                "Dispatch round complete"
            );

            if retryable.is_empty() {
                break;
            }
            if auth_expired {
                if let Err(err) = self.dispatcher.guard().invalidate_if_current(&round.credential).await {
                    warn!(error = %err, "Credential invalidation incomplete");
                }
            }
            if !state.consume() {
                warn!(remaining = retryable.len(), "Retry budget exhausted");
                for &index in &retryable {
                    if let Some(slot) = finals.get_mut(index) {
                        *slot = slot.take().map(SubResult::into_exhausted);
                    }
                }
                break;
            }

            if let Some(wait) = wait {
                info!(wait_secs = wait.as_secs_f64(), "Rate limited, backing off");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(BatchError::Cancelled),
                    () = self.sleeper.sleep(wait) => {}
                }
            }

            working = retryable;
        }

        let classifier = self.dispatcher.classifier();
        Ok(finals
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| classifier.missing_response(request.id.clone(), 0))
            })
            .collect())
    }
}
