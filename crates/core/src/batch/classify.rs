//! Sub-response classification
//!
//! The only place raw batch replies are inspected. Everything after this
//! boundary works with `SubResult`/`SubOutcome`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use refsync_domain::{
    BatchEnvelope, BatchResponseBody, FailureCause, LogicalRequest, ProviderError, RefSyncError,
    RequestId, RetryConfig, SubOutcome, SubResult, WireSubResponse,
};
use serde_json::Value;
use tracing::warn;

use super::ports::HttpReply;

const RETRY_AFTER_HEADER: &str = "retry-after";

/// Parse a `Retry-After` value given in seconds (integer or decimal).
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Maps statuses and provider error codes onto `SubOutcome`.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    auth_error_codes: HashSet<String>,
    throttle_error_codes: HashSet<String>,
    throttle_statuses: HashSet<u16>,
    default_retry_after: Duration,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl ResponseClassifier {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            auth_error_codes: config.auth_error_codes.iter().cloned().collect(),
            throttle_error_codes: config.throttle_error_codes.iter().cloned().collect(),
            throttle_statuses: config.throttle_statuses.iter().copied().collect(),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }

    /// Classify one status/body pair.
    ///
    /// `failure` is the cause recorded if the result turns out to be a final
    /// failure: `SubRequestFailed` for sub-responses, `OuterBatchFailed` when
    /// the envelope call itself failed.
    pub fn classify(
        &self,
        request_id: RequestId,
        status: u16,
        retry_after: Option<Duration>,
        body: Option<Value>,
        failure: FailureCause,
    ) -> SubResult {
        let error = ProviderError::from_body(body.as_ref());
        let code = error.as_ref().map(|e| e.code.as_str());

        let outcome = if status != 0 && status < 300 {
            SubOutcome::Ok
        } else if status == 401 || code.is_some_and(|c| self.auth_error_codes.contains(c)) {
            SubOutcome::AuthExpired
        } else if self.throttle_statuses.contains(&status)
            || code.is_some_and(|c| self.throttle_error_codes.contains(c))
        {
            SubOutcome::RateLimited { retry_after: retry_after.unwrap_or(self.default_retry_after) }
        } else {
            SubOutcome::Failed(failure)
        };

        SubResult { request_id, status, body, error, outcome }
    }

    /// Classify one entry of a 2xx batch response.
    pub fn sub_response(&self, request_id: RequestId, response: WireSubResponse) -> SubResult {
        let retry_after = response.header(RETRY_AFTER_HEADER).and_then(parse_retry_after);
        self.classify(
            request_id,
            response.status,
            retry_after,
            response.body,
            FailureCause::SubRequestFailed,
        )
    }

    /// Final envelope-level failure that bypasses status classification
    /// (malformed body, missing sub-response, no reply at all).
    pub fn envelope_failure(
        &self,
        request_id: RequestId,
        status: u16,
        error: ProviderError,
    ) -> SubResult {
        SubResult {
            request_id,
            status,
            body: None,
            error: Some(error),
            outcome: SubOutcome::Failed(FailureCause::OuterBatchFailed),
        }
    }

    /// Result for a request the reply did not mention.
    pub fn missing_response(&self, request_id: RequestId, status: u16) -> SubResult {
        self.envelope_failure(
            request_id,
            status,
            ProviderError::new("missingResponse", "batch reply had no entry for this request"),
        )
    }

    /// Demultiplex an outer reply into `(dispatch position, result)` pairs,
    /// one per envelope member.
    pub fn parse_envelope(
        &self,
        envelope: &BatchEnvelope,
        requests: &[LogicalRequest],
        reply: &HttpReply,
    ) -> Vec<(usize, SubResult)> {
        let id_at = |position: usize| -> RequestId {
            requests.get(position).map(|r| r.id.clone()).unwrap_or_else(|| RequestId::new(""))
        };

        if !reply.is_success() {
            let body = serde_json::from_str::<Value>(&reply.body).ok();
            let retry_after = reply.header(RETRY_AFTER_HEADER).and_then(parse_retry_after);
            return envelope
                .members()
                .iter()
                .map(|&position| {
                    let result = self.classify(
                        id_at(position),
                        reply.status,
                        retry_after,
                        body.clone(),
                        FailureCause::OuterBatchFailed,
                    );
                    (position, result)
                })
                .collect();
        }

        let parsed: BatchResponseBody = match serde_json::from_str(&reply.body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(status = reply.status, error = %err, "Malformed batch response body");
                let error = ProviderError::new("malformedResponse", err.to_string());
                return envelope
                    .members()
                    .iter()
                    .map(|&position| {
                        (position, self.envelope_failure(id_at(position), reply.status, error.clone()))
                    })
                    .collect();
            }
        };

        let mut by_position: HashMap<usize, WireSubResponse> = HashMap::new();
        for response in parsed.responses {
            match envelope.position_of(&response.id) {
                Some(position) if by_position.contains_key(&position) => {
                    warn!(sequence_id = %response.id, "Duplicate sub-response ignored");
                }
                Some(position) => {
                    by_position.insert(position, response);
                }
                None => warn!(sequence_id = %response.id, "Sub-response with unknown id ignored"),
            }
        }

        envelope
            .members()
            .iter()
            .map(|&position| {
                let result = match by_position.remove(&position) {
                    Some(response) => self.sub_response(id_at(position), response),
                    None => self.missing_response(id_at(position), reply.status),
                };
                (position, result)
            })
            .collect()
    }

    /// Every envelope member fails when no reply was received.
    pub fn transport_failure(
        &self,
        envelope: &BatchEnvelope,
        requests: &[LogicalRequest],
        err: &RefSyncError,
    ) -> Vec<(usize, SubResult)> {
        let error = ProviderError::new("transportError", err.to_string());
        envelope
            .members()
            .iter()
            .filter_map(|&position| {
                requests.get(position).map(|request| {
                    (position, self.envelope_failure(request.id.clone(), 0, error.clone()))
                })
            })
            .collect()
    }
}
