//! Credential acquisition and lifecycle

pub mod authenticator;
pub mod error;
pub mod guard;
pub mod ports;

pub use authenticator::DeviceAuthenticator;
pub use error::AuthError;
pub use guard::TokenGuard;
pub use ports::{CredentialStore, DeviceFlowClient, PollOutcome, VerificationPresenter};
