//! # RefSync Core
//!
//! Business logic for authenticated, batched, retrying requests.
//!
//! This crate contains:
//! - Port interfaces (traits) for storage, identity, transport and time
//! - The device-code authenticator and process-wide token guard
//! - Batch dispatch with a single response-classification boundary
//! - The retry coordinator that is the public send entry point
//! - Share-link request builders and link extraction
//!
//! ## Architecture Principles
//! - Only depends on `refsync-domain`
//! - No HTTP, filesystem or platform code
//! - All external effects go through traits

pub mod auth;
pub mod batch;
pub mod library;
pub mod retry;
pub mod sharing;
pub mod time;

pub use auth::{
    AuthError, CredentialStore, DeviceAuthenticator, DeviceFlowClient, PollOutcome, TokenGuard,
    VerificationPresenter,
};
pub use batch::dispatcher::DispatchRound;
pub use batch::{BatchDispatcher, BatchError, BatchTransport, HttpReply, ResponseClassifier};
pub use library::LibraryClient;
pub use retry::RetryCoordinator;
pub use sharing::LinkKind;
pub use time::Sleeper;
