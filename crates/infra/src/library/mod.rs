//! Reference-library adapters

pub mod zotero;

pub use zotero::ZoteroClient;
