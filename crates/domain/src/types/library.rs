//! Reference-library items and query filters
//!
//! Items are carried as opaque metadata maps; only a handful of accessors
//! read well-known keys for logging and path derivation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One item from the reference library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub key: String,
    #[serde(default)]
    pub version: u64,
    /// Free-form metadata (title, itemType, tags, path, url, ...).
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl LibraryItem {
    fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.data_str("title")
    }

    pub fn item_type(&self) -> Option<&str> {
        self.data_str("itemType")
    }

    /// Key of the parent item, for attachments and notes.
    pub fn parent_key(&self) -> Option<&str> {
        self.data_str("parentItem")
    }

    /// Tag names, in library order.
    pub fn tags(&self) -> Vec<&str> {
        self.data
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(|t| t.get("tag").and_then(Value::as_str)).collect())
            .unwrap_or_default()
    }
}

/// Server-side filter for item listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Quick-search text.
    pub q: Option<String>,
    pub item_type: Option<String>,
    /// Tag expressions; a leading `-` excludes the tag.
    pub tags: Vec<String>,
    /// Only top-level items (no child attachments or notes).
    pub top: bool,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level items only.
    pub fn top() -> Self {
        Self { top: true, ..Self::default() }
    }

    #[must_use]
    pub fn query(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    #[must_use]
    pub fn item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn without_tag(mut self, tag: impl AsRef<str>) -> Self {
        self.tags.push(format!("-{}", tag.as_ref()));
        self
    }

    /// Query-string pairs, excluding paging parameters.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(item_type) = &self.item_type {
            pairs.push(("itemType", item_type.clone()));
        }
        pairs.extend(self.tags.iter().map(|tag| ("tag", tag.clone())));
        pairs
    }
}
