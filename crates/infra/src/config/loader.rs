//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read a `.env` file if one exists (`dotenvy`)
//! 2. Load from environment variables when `REFSYNC_CLIENT_ID` is set
//! 3. Otherwise fall back to the first config file found by
//!    [`locate_config_path`]
//!
//! ## Environment Variables
//! - `REFSYNC_CLIENT_ID`: application (client) id, required
//! - `REFSYNC_AUTHORITY`: identity authority URL
//! - `REFSYNC_SCOPES`: scopes, separated by spaces or commas
//! - `REFSYNC_CREDENTIAL_PATH`: credential file location
//! - `REFSYNC_GRAPH_BASE_URL`: batch endpoint base URL
//! - `REFSYNC_BATCH_SIZE`: sub-requests per envelope
//! - `REFSYNC_MAX_RETRIES`: retry rounds per send
//! - `REFSYNC_LIBRARY_ID`: reference-library id
//! - `REFSYNC_LIBRARY_TYPE`: `user` or `group`
//! - `REFSYNC_LIBRARY_API_KEY`: reference-library API key
//!
//! Unset optional variables keep their [`Config::default`] values.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use refsync_domain::{Config, LibraryType, RefSyncError, Result};

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: &[&str] = &["refsync.toml", "refsync.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `RefSyncError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `REFSYNC_*` environment variables
///
/// # Errors
/// Returns `RefSyncError::Config` if `REFSYNC_CLIENT_ID` is missing or a
/// numeric or enum variable cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.auth.client_id = env_var("REFSYNC_CLIENT_ID")?;

    if let Some(authority) = env_opt("REFSYNC_AUTHORITY") {
        config.auth.authority = authority;
    }
    if let Some(scopes) = env_opt("REFSYNC_SCOPES") {
        config.auth.scopes = split_scopes(&scopes);
    }
    if let Some(path) = env_opt("REFSYNC_CREDENTIAL_PATH") {
        config.auth.credential_path = PathBuf::from(path);
    }
    if let Some(base_url) = env_opt("REFSYNC_GRAPH_BASE_URL") {
        config.graph.base_url = base_url;
    }
    if let Some(size) = env_parse::<usize>("REFSYNC_BATCH_SIZE")? {
        config.graph.batch_size = size;
    }
    if let Some(retries) = env_parse::<u32>("REFSYNC_MAX_RETRIES")? {
        config.retry.max_retries = retries;
    }
    if let Some(id) = env_opt("REFSYNC_LIBRARY_ID") {
        config.library.library_id = id;
    }
    if let Some(kind) = env_opt("REFSYNC_LIBRARY_TYPE") {
        config.library.library_type = LibraryType::from_str(&kind)
            .map_err(|e| RefSyncError::Config(format!("Invalid REFSYNC_LIBRARY_TYPE: {e}")))?;
    }
    if let Some(key) = env_opt("REFSYNC_LIBRARY_API_KEY") {
        config.library.api_key = Some(key);
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. The format is
/// detected by extension.
///
/// # Errors
/// Returns `RefSyncError::Config` if the file is missing, unreadable, in an
/// unsupported format, or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RefSyncError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => locate_config_path().ok_or_else(|| {
            RefSyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RefSyncError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration text, choosing TOML or JSON by the path's extension.
///
/// # Errors
/// Returns `RefSyncError::Config` on an unsupported extension or a parse
/// failure.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RefSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RefSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory, then next to the
/// executable.
pub fn locate_config_path() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    locate_in(&dirs)
}

fn locate_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| RefSyncError::Config(format!("Missing required environment variable: {key}")))
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| raw.parse::<T>().map_err(|e| RefSyncError::Config(format!("Invalid {key}: {e}"))))
        .transpose()
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
