//! Batched request dispatch
//!
//! This module packs logical requests into multiplexed envelopes, sends them
//! through a `BatchTransport`, and classifies every sub-response at a single
//! parsing boundary.

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod ports;

pub use classify::{parse_retry_after, ResponseClassifier};
pub use dispatcher::BatchDispatcher;
pub use error::BatchError;
pub use ports::{BatchTransport, HttpReply};
