//! Share-link modes

use serde::{Deserialize, Serialize};

/// Kind of anonymous link requested from the storage provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// Read-only link.
    #[default]
    View,
    Edit,
    /// Direct-download link, passed through as returned.
    Download,
    /// Embeddable link; rewritten to a direct-download link on extraction.
    Embed,
}

crate::impl_wire_name_conversions!(ShareMode {
    View => "view",
    Edit => "edit",
    Download => "download",
    Embed => "embed",
});
