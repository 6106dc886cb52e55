//! JSON-file credential store
//!
//! The file holds the provider's raw token response verbatim. Saves write a
//! sibling temp file and rename it over the target, so a crash mid-write
//! leaves either the old record or the new one.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use refsync_core::CredentialStore;
use refsync_domain::{Credential, RefSyncError, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Credential store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored credential");
                return Ok(None);
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let raw: Value = match serde_json::from_str(&contents) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Stored credential is malformed, ignoring");
                return Ok(None);
            }
        };

        match Credential::from_token_response(raw) {
            Ok(credential) => Ok(Some(credential)),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Stored credential is unusable, ignoring");
                Ok(None)
            }
        }
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let contents = serde_json::to_vec_pretty(credential.raw()).map_err(InfraError::from)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await.map_err(InfraError::from)?;
        restrict_permissions(&temp).await?;

        if let Err(err) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(InfraError::from(err).into());
        }
        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credential cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(RefSyncError::from(InfraError::from(err))),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|err| InfraError::from(err).into())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
