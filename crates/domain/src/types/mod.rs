//! Domain data types

pub mod batch;
pub mod credential;
pub mod library;
pub mod request;
pub mod result;
pub mod retry;
pub mod share;

pub use batch::{BatchEnvelope, BatchRequestBody, BatchResponseBody, WireSubRequest, WireSubResponse};
pub use credential::{Credential, DeviceCode};
pub use library::{ItemFilter, LibraryItem};
pub use request::{HttpMethod, LogicalRequest, RequestId};
pub use result::{FailureCause, ProviderError, SubOutcome, SubResult, TransientCause};
pub use retry::RetryState;
pub use share::ShareMode;
