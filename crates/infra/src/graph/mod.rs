//! Microsoft Graph batch endpoint adapter

pub mod transport;

pub use transport::GraphBatchTransport;
