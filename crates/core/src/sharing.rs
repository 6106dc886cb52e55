//! Cloud-drive share links
//!
//! Builders that turn local file paths into drive API requests, and
//! extraction of the resulting links from `SubResult`s.

use std::path::{Component, Path};

use refsync_domain::{LogicalRequest, RefSyncError, RequestId, Result, ShareMode, SubResult};
use serde_json::{json, Value};

/// Which link a result is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `createLink` response: `link.webUrl`.
    Share(ShareMode),
    /// Item metadata: `webUrl`.
    Metadata,
}

/// Path of `path` below the synced drive root, `/`-separated.
///
/// # Errors
/// Returns `RefSyncError::InvalidInput` if `path` is not inside `root` or
/// names the root itself.
pub fn relative_cloud_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        RefSyncError::InvalidInput(format!("Path not in cloud root: {}", path.display()))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(RefSyncError::InvalidInput(format!(
                    "Unsupported path component in {}",
                    path.display()
                )))
            }
        }
    }
    if segments.is_empty() {
        return Err(RefSyncError::InvalidInput("Path is the cloud root itself".to_string()));
    }
    Ok(segments.join("/"))
}

/// Percent-encode each segment of a `/`-separated drive path.
pub fn encode_drive_path(relative: &str) -> String {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `POST /me/drive/root:/{path}:/createLink` for an anonymous link.
pub fn share_link_request(id: impl Into<RequestId>, relative: &str, mode: ShareMode) -> LogicalRequest {
    LogicalRequest::post(
        id,
        format!("/me/drive/root:/{}:/createLink", encode_drive_path(relative)),
        json!({"type": mode.as_str(), "scope": "anonymous"}),
    )
}

/// `GET /me/drive/root:/{path}` for item metadata.
pub fn metadata_request(id: impl Into<RequestId>, relative: &str) -> LogicalRequest {
    LogicalRequest::get(id, format!("/me/drive/root:/{}", encode_drive_path(relative)))
}

/// Link carried by a successful result.
///
/// # Errors
/// Returns a human-readable message: the provider error
/// (`"{status} {code}: {message}"` or `"Unknown error {status}"`) for failed
/// results, or a note that a successful body had no link.
pub fn extract_link(result: &SubResult, kind: LinkKind) -> std::result::Result<String, String> {
    if !result.is_ok() {
        return Err(result.describe_error());
    }

    let body = result.body.as_ref();
    let url = match kind {
        LinkKind::Share(_) => body.and_then(|b| b.get("link")).and_then(|l| l.get("webUrl")),
        LinkKind::Metadata => body.and_then(|b| b.get("webUrl")),
    }
    .and_then(Value::as_str)
    .ok_or_else(|| format!("{} response has no link", result.status))?;

    Ok(match kind {
        LinkKind::Share(ShareMode::Embed) => url.replace("embed", "download"),
        _ => url.to_string(),
    })
}
