//! Configuration structures
//!
//! Every section deserializes with defaults so a partial TOML or JSON file is
//! enough; only `auth.client_id` has no usable default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTHORITY, DEFAULT_AUTH_ERROR_CODES, DEFAULT_BATCH_SIZE, DEFAULT_CREDENTIAL_FILE,
    DEFAULT_GRAPH_BASE_URL, DEFAULT_LIBRARY_BASE_URL, DEFAULT_LIBRARY_PAGE_SIZE,
    DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_AFTER_SECS, DEFAULT_SCOPES,
    DEFAULT_THROTTLE_ERROR_CODES, DEFAULT_THROTTLE_STATUSES, MAX_BATCH_SIZE,
};
use crate::{RefSyncError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub graph: GraphConfig,
    pub retry: RetryConfig,
    pub library: LibraryConfig,
}

impl Config {
    /// Check cross-field constraints that serde defaults cannot express.
    ///
    /// # Errors
    /// Returns `RefSyncError::Config` when `auth.client_id` is empty or
    /// `graph.batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.auth.client_id.trim().is_empty() {
            return Err(RefSyncError::Config("auth.client_id must be set".to_string()));
        }
        if self.graph.batch_size == 0 {
            return Err(RefSyncError::Config("graph.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Identity provider settings for the device-code flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_id: String,
    pub authority: String,
    pub scopes: Vec<String>,
    pub credential_path: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_FILE),
        }
    }
}

/// Batch endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub batch_size: usize,
    pub request_timeout_secs: u64,
}

impl GraphConfig {
    /// Batch cap actually used when chunking, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Retry policy and the provider signals that drive it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Provider error codes meaning the bearer credential is stale.
    pub auth_error_codes: Vec<String>,
    /// Provider error codes meaning "slow down".
    pub throttle_error_codes: Vec<String>,
    /// HTTP statuses treated as throttling regardless of error code.
    pub throttle_statuses: Vec<u16>,
    /// Wait used when a throttled response carries no `Retry-After`.
    pub default_retry_after_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            auth_error_codes: DEFAULT_AUTH_ERROR_CODES.iter().map(ToString::to_string).collect(),
            throttle_error_codes: DEFAULT_THROTTLE_ERROR_CODES
                .iter()
                .map(ToString::to_string)
                .collect(),
            throttle_statuses: DEFAULT_THROTTLE_STATUSES.to_vec(),
            default_retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
        }
    }
}

/// Reference-library service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub base_url: String,
    pub library_id: String,
    pub library_type: LibraryType,
    pub api_key: Option<String>,
    pub page_size: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LIBRARY_BASE_URL.to_string(),
            library_id: String::new(),
            library_type: LibraryType::User,
            api_key: None,
            page_size: DEFAULT_LIBRARY_PAGE_SIZE,
        }
    }
}

/// Whether a library belongs to a user or a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    /// URL path prefix segment (`users` or `groups`).
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Group => "groups",
        }
    }
}

crate::impl_wire_name_conversions!(LibraryType {
    User => "user",
    Group => "group",
});
