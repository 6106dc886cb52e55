//! Sleep abstraction
//!
//! Rate-limit back-off and device-code polling both wait on a `Sleeper` so
//! tests can observe requested waits without real time passing.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the caller for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
