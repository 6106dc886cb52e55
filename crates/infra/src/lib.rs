//! # RefSync Infrastructure
//!
//! Implementations of the `refsync-core` ports.
//!
//! This crate contains:
//! - JSON-file credential store
//! - Microsoft device-code client and the console presenter
//! - `$batch` transport over a retrying reqwest client
//! - Zotero library reader
//! - Configuration loading and tracing setup
//! - [`RefSyncClient`], which wires all of the above together
//!
//! ## Architecture
//! - Implements traits defined in `refsync-core`
//! - Contains all "impure" code (HTTP, filesystem, processes)

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod graph;
pub mod http;
pub mod library;
pub mod observability;
pub mod time;

pub use auth::{FileCredentialStore, MicrosoftDeviceFlowClient, SystemPresenter};
pub use client::{LinkResult, RefSyncClient};
pub use errors::InfraError;
pub use graph::GraphBatchTransport;
pub use http::{HttpClient, HttpClientBuilder};
pub use library::ZoteroClient;
pub use observability::{init_tracing, LogFormat};
pub use time::TokioSleeper;
