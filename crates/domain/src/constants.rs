//! Domain constants
//!
//! Defaults for configuration values and the fixed protocol strings used by
//! the identity and batch endpoints.

// Identity provider
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/consumers";
pub const DEFAULT_SCOPES: &[&str] = &["Files.ReadWrite.All"];
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
pub const DEFAULT_DEVICE_CODE_EXPIRES_SECS: u64 = 900;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;
pub const DEFAULT_CREDENTIAL_FILE: &str = "refsync_token.json";

// Batch endpoint
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const BATCH_PATH: &str = "$batch";
pub const DEFAULT_BATCH_SIZE: usize = 15;
pub const MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Retry policy
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;
pub const DEFAULT_AUTH_ERROR_CODES: &[&str] = &["InvalidAuthenticationToken"];
pub const DEFAULT_THROTTLE_ERROR_CODES: &[&str] = &["activityLimitReached", "TooManyRequests"];
pub const DEFAULT_THROTTLE_STATUSES: &[u16] = &[429, 503];

// Reference library
pub const DEFAULT_LIBRARY_BASE_URL: &str = "https://api.zotero.org";
pub const DEFAULT_LIBRARY_PAGE_SIZE: u32 = 100;
pub const LIBRARY_API_KEY_HEADER: &str = "Zotero-API-Key";
pub const LIBRARY_TOTAL_RESULTS_HEADER: &str = "Total-Results";
