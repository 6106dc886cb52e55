//! Credential persistence, device-flow client and user presentation

pub mod device_flow;
pub mod file_store;
pub mod presenter;

pub use device_flow::MicrosoftDeviceFlowClient;
pub use file_store::FileCredentialStore;
pub use presenter::SystemPresenter;
