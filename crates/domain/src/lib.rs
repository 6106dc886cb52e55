//! # RefSync Domain
//!
//! Data types shared by every RefSync crate.
//!
//! This crate contains:
//! - Credentials and device-code grants
//! - Logical requests, batch envelopes and per-request results
//! - Domain error types and Result definitions
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - No dependencies on other RefSync crates
//! - No I/O; pure data and validation

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
