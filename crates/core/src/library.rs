//! Port interface for the reference-library service

use async_trait::async_trait;
use refsync_domain::{ItemFilter, LibraryItem, Result};

/// Paged reader over a reference library.
#[async_trait]
pub trait LibraryClient: Send + Sync {
    /// Every item matching `filter`, across all pages.
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<LibraryItem>>;

    /// Child items (attachments, notes) of `item_key` matching `filter`.
    async fn list_children(&self, item_key: &str, filter: &ItemFilter) -> Result<Vec<LibraryItem>>;
}
