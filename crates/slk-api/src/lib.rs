//! slk-api
//!
//! Remote inventory API client: paginated collection fetch with an
//! incremental filter. This crate owns the transport boundary and nothing
//! else — watermark handling, validation and reconciliation live upstream.
//!
//! The remote paginates as
//! `GET <base>/<collection>?modifiedSince=..&sourceId=..&page=<n>` returning
//! `{"Items": [...], "Pagination": {"NumberOfPages": n, ...}}`. Pages are
//! fetched sequentially in ascending order and every page response is
//! status-checked before its items are merged; a failed page discards the
//! whole accumulated fetch.

use serde::Deserialize;
use slk_core::RemoteRecord;
use std::fmt;
use tracing::debug;

/// Incremental fetch filter. Opaque to the fetcher: both parameters are
/// forwarded verbatim as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// ISO-8601 millisecond-precision lower bound (`modifiedSince`).
    pub modified_since: Option<String>,
    /// Fixed scoping parameter (`sourceId`).
    pub source_id: Option<String>,
}

/// API credential pair, sent as the `api-auth-id` / `api-auth-key` headers.
/// The signature scheme itself belongs to the remote; we only carry the
/// values.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub id: String,
    pub key: String,
}

/// Errors the fetch boundary can produce. All of them abort the run before
/// reconciliation begins.
#[derive(Debug)]
pub enum ApiError {
    /// Network or protocol failure reaching the remote.
    Transport(String),
    /// A page response came back with a non-success status; the partial
    /// accumulation has been discarded.
    UnexpectedStatus { page: u32, status: u16 },
    /// A page body did not decode into the pagination envelope.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "transport error: {msg}"),
            ApiError::UnexpectedStatus { page, status } => {
                write!(f, "unexpected status {status} on page {page}")
            }
            ApiError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(rename = "Items")]
    items: Vec<RemoteRecord>,
    #[serde(rename = "Pagination")]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(rename = "NumberOfPages")]
    number_of_pages: u32,
}

/// HTTP client for the remote inventory API.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
}

impl InventoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            collection.trim_matches('/')
        )
    }

    /// Fetch every page of `collection` under `filter`, merged in page order.
    pub async fn fetch_all(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<RemoteRecord>, ApiError> {
        let first = self.fetch_page(collection, filter, 1).await?;
        let pages = first
            .pagination
            .as_ref()
            .map(|p| p.number_of_pages)
            .unwrap_or(1);
        let mut items = first.items;

        for page in 2..=pages {
            let envelope = self.fetch_page(collection, filter, page).await?;
            items.extend(envelope.items);
        }

        debug!(collection, pages, items = items.len(), "fetch complete");
        Ok(items)
    }

    async fn fetch_page(
        &self,
        collection: &str,
        filter: &Filter,
        page: u32,
    ) -> Result<PageEnvelope, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(since) = &filter.modified_since {
            query.push(("modifiedSince", since.clone()));
        }
        if let Some(source_id) = &filter.source_id {
            query.push(("sourceId", source_id.clone()));
        }
        query.push(("page", page.to_string()));

        let mut request = self.http.get(self.collection_url(collection)).query(&query);
        if let Some(creds) = &self.credentials {
            request = request
                .header("api-auth-id", &creds.id)
                .header("api-auth-key", &creds.key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                page,
                status: status.as_u16(),
            });
        }

        response
            .json::<PageEnvelope>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_url_joins_without_double_slashes() {
        let client = InventoryClient::new("http://api.example.test/");
        assert_eq!(
            client.collection_url("/Products/"),
            "http://api.example.test/Products"
        );
    }

    #[test]
    fn error_display_names_the_failing_page() {
        let err = ApiError::UnexpectedStatus {
            page: 2,
            status: 503,
        };
        assert_eq!(err.to_string(), "unexpected status 503 on page 2");
    }
}
