//! Zotero Web API v3 reader
//!
//! Pages through `/{users|groups}/{id}/items` with `start`/`limit`. Paging
//! stops at a short page or once `Total-Results` items have been read.

use async_trait::async_trait;
use refsync_core::LibraryClient;
use refsync_domain::constants::{LIBRARY_API_KEY_HEADER, LIBRARY_TOTAL_RESULTS_HEADER};
use refsync_domain::{ItemFilter, LibraryConfig, LibraryItem, RefSyncError, Result};
use reqwest::Method;
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

#[derive(Clone)]
pub struct ZoteroClient {
    http: HttpClient,
    base_url: String,
    library_prefix: String,
    api_key: Option<String>,
    page_size: u32,
}

impl ZoteroClient {
    /// # Errors
    /// Returns `RefSyncError::Config` when no library id is configured.
    pub fn from_config(http: HttpClient, config: &LibraryConfig) -> Result<Self> {
        if config.library_id.trim().is_empty() {
            return Err(RefSyncError::Config("library.library_id is required".into()));
        }
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            library_prefix: format!("{}/{}", config.library_type.path_segment(), config.library_id.trim()),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            page_size: config.page_size.clamp(1, 100),
        })
    }

    async fn fetch_all(&self, path: &str, filter: &ItemFilter) -> Result<Vec<LibraryItem>> {
        let url = format!("{}/{}/{path}", self.base_url, self.library_prefix);
        let mut items: Vec<LibraryItem> = Vec::new();
        let mut start: usize = 0;

        loop {
            let mut builder = self
                .http
                .request(Method::GET, &url)
                .query(&[("format", "json"), ("v", "3")])
                .query(&[("start", start.to_string()), ("limit", self.page_size.to_string())])
                .query(&filter.query_pairs());
            if let Some(key) = &self.api_key {
                builder = builder.header(LIBRARY_API_KEY_HEADER, key);
            }

            let response = self.http.send(builder).await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(match status.as_u16() {
                    401 | 403 => RefSyncError::Auth(format!("library rejected credentials ({status}): {text}")),
                    404 => RefSyncError::InvalidInput(format!("library path not found: {url}")),
                    _ => RefSyncError::Network(format!("library request failed ({status}): {text}")),
                });
            }

            let total = response
                .headers()
                .get(LIBRARY_TOTAL_RESULTS_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<usize>().ok());
            let page: Vec<LibraryItem> = response.json().await.map_err(InfraError::from)?;
            let fetched = page.len();
            items.extend(page);
            start += fetched;

            debug!(fetched, total_so_far = items.len(), ?total, "Library page read");

            let short_page = fetched < self.page_size as usize;
            let reached_total = total.is_some_and(|total| start >= total);
            if fetched == 0 || short_page || reached_total {
                break;
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl LibraryClient for ZoteroClient {
    #[instrument(skip(self), fields(library = %self.library_prefix))]
    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<LibraryItem>> {
        let path = if filter.top { "items/top" } else { "items" };
        self.fetch_all(path, filter).await
    }

    #[instrument(skip(self), fields(library = %self.library_prefix))]
    async fn list_children(&self, item_key: &str, filter: &ItemFilter) -> Result<Vec<LibraryItem>> {
        if item_key.trim().is_empty() {
            return Err(RefSyncError::InvalidInput("item key must not be empty".into()));
        }
        let path = format!("items/{}/children", urlencoding::encode(item_key.trim()));
        self.fetch_all(&path, filter).await
    }
}
