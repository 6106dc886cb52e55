//! Per-request outcomes
//!
//! A `SubResult` is produced once per logical request by the single parsing
//! boundary in the dispatcher. Everything downstream matches on `SubOutcome`
//! instead of inspecting raw response bodies.

use std::time::Duration;

use serde_json::Value;

use super::request::RequestId;

/// Error code and message reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    /// Extract `{"error": {"code", "message"}}` from a response body.
    pub fn from_body(body: Option<&Value>) -> Option<Self> {
        let error = body?.get("error")?;
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
        if code.is_empty() && message.is_empty() {
            return None;
        }
        Some(Self::new(code, message))
    }
}

/// Transient failure classes that drive the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientCause {
    AuthExpired,
    RateLimited { retry_after: Duration },
}

/// Why a final failure is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The envelope call itself failed.
    OuterBatchFailed,
    /// The provider rejected this one operation.
    SubRequestFailed,
    /// Still transient when the retry budget ran out.
    RetryBudgetExhausted { last: TransientCause },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubOutcome {
    Ok,
    AuthExpired,
    RateLimited { retry_after: Duration },
    Failed(FailureCause),
}

/// Outcome of one logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubResult {
    pub request_id: RequestId,
    /// HTTP status; `0` when no response was received at all.
    pub status: u16,
    pub body: Option<Value>,
    pub error: Option<ProviderError>,
    pub outcome: SubOutcome,
}

impl SubResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, SubOutcome::Ok)
    }

    /// `true` for auth-expired and rate-limited results.
    pub fn is_retryable(&self) -> bool {
        self.transient_cause().is_some()
    }

    pub fn transient_cause(&self) -> Option<TransientCause> {
        match self.outcome {
            SubOutcome::AuthExpired => Some(TransientCause::AuthExpired),
            SubOutcome::RateLimited { retry_after } => {
                Some(TransientCause::RateLimited { retry_after })
            }
            SubOutcome::Ok | SubOutcome::Failed(_) => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self.outcome {
            SubOutcome::RateLimited { retry_after } => Some(retry_after),
            _ => None,
        }
    }

    pub fn failure_cause(&self) -> Option<FailureCause> {
        match self.outcome {
            SubOutcome::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    /// Turn a still-transient result into a final `RetryBudgetExhausted`
    /// failure. Status, body and provider error are kept. Final results are
    /// returned unchanged.
    #[must_use]
    pub fn into_exhausted(self) -> Self {
        match self.transient_cause() {
            Some(last) => {
                Self { outcome: SubOutcome::Failed(FailureCause::RetryBudgetExhausted { last }), ..self }
            }
            None => self,
        }
    }

    /// `"{status} {code}: {message}"`, or `"Unknown error {status}"` when the
    /// provider sent no error object.
    pub fn describe_error(&self) -> String {
        match &self.error {
            Some(error) => format!("{} {}: {}", self.status, error.code, error.message),
            None => format!("Unknown error {}", self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(status: u16, outcome: SubOutcome) -> SubResult {
        SubResult {
            request_id: RequestId::from("a"),
            status,
            body: None,
            error: Some(ProviderError::new("TooManyRequests", "slow down")),
            outcome,
        }
    }

    #[test]
    fn provider_error_parses_graph_shape() {
        let body = json!({"error": {"code": "itemNotFound", "message": "missing"}});
        let error = ProviderError::from_body(Some(&body)).unwrap();
        assert_eq!(error, ProviderError::new("itemNotFound", "missing"));
        assert!(ProviderError::from_body(Some(&json!({"id": 1}))).is_none());
        assert!(ProviderError::from_body(None).is_none());
    }

    #[test]
    fn exhausting_keeps_last_cause_and_error() {
        let retry_after = Duration::from_secs(5);
        let exhausted = result(429, SubOutcome::RateLimited { retry_after }).into_exhausted();
        assert_eq!(
            exhausted.failure_cause(),
            Some(FailureCause::RetryBudgetExhausted {
                last: TransientCause::RateLimited { retry_after }
            })
        );
        assert_eq!(exhausted.status, 429);
        assert_eq!(exhausted.describe_error(), "429 TooManyRequests: slow down");
        assert!(!exhausted.is_retryable());
    }

    #[test]
    fn exhausting_final_result_is_noop() {
        let ok = result(200, SubOutcome::Ok);
        assert_eq!(ok.clone().into_exhausted(), ok);
    }

    #[test]
    fn describe_error_without_provider_error() {
        let mut failed = result(500, SubOutcome::Failed(FailureCause::SubRequestFailed));
        failed.error = None;
        assert_eq!(failed.describe_error(), "Unknown error 500");
    }
}
