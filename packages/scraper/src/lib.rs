#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transport and raw table extraction for ranking sites.
//!
//! Provides the [`Fetcher`] transport trait (with a `reqwest`-backed
//! [`HttpFetcher`]), markup helpers ([`markup`]), and extractors that turn
//! the three table encodings seen on ranking sites into a [`RawTable`]:
//! JSON column/data tables ([`json_table`]), HTML tables ([`html_table`]),
//! and MediaWiki tables ([`wikitext`]).
//!
//! This crate knows nothing about canonical fields. Cell values are kept as
//! raw strings (possibly containing markup) for the caller to normalize.

pub mod html_table;
pub mod json_table;
pub mod markup;
pub mod wikitext;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

/// User agent sent by [`HttpFetcher`].
const USER_AGENT: &str = concat!("rankr/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching or parsing a source document.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The document does not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A response returned by a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl FetchResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport used to retrieve source documents.
///
/// Implementations own timeouts and cancellation; callers never retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs a GET request with the given extra headers.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the request cannot be completed. A
    /// non-success status is *not* an error at this level.
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, ScrapeError>;
}

/// Fetches `url` and returns its body, treating any non-2xx status as an
/// error.
///
/// # Errors
///
/// Returns [`ScrapeError::Status`] for non-success responses, or whatever
/// the transport reports.
pub async fn fetch_text(
    fetcher: &dyn Fetcher,
    url: &str,
    headers: &BTreeMap<String, String>,
) -> Result<String, ScrapeError> {
    log::debug!("GET {url}");
    let response = fetcher.fetch(url, headers).await?;
    if !response.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_owned(),
            status: response.status,
        });
    }
    Ok(response.body)
}

/// [`Fetcher`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

/// Converts string headers into a [`reqwest::header::HeaderMap`].
fn header_map(
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::header::HeaderMap, ScrapeError> {
    let mut header_map = reqwest::header::HeaderMap::new();
    for (key, value) in headers {
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ScrapeError::Parse(format!("invalid header name '{key}': {e}")))?;
        let val = reqwest::header::HeaderValue::from_str(value)
            .map_err(|e| ScrapeError::Parse(format!("invalid header value '{value}': {e}")))?;
        header_map.insert(name, val);
    }
    Ok(header_map)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, ScrapeError> {
        let response = self
            .client
            .get(url)
            .headers(header_map(headers)?)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

/// In-memory [`Fetcher`] serving canned responses by exact URL.
///
/// Unknown URLs answer with status 404. Useful for tests and for replaying
/// previously downloaded pages.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: BTreeMap<String, FetchResponse>,
}

impl StaticFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with status 200 for `url`.
    #[must_use]
    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, body)
    }

    /// Serves `body` with the given status for `url`.
    #[must_use]
    pub fn with_response(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses.insert(
            url.to_owned(),
            FetchResponse {
                status,
                body: body.to_owned(),
            },
        );
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(
        &self,
        url: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, ScrapeError> {
        Ok(self.responses.get(url).cloned().unwrap_or(FetchResponse {
            status: 404,
            body: String::new(),
        }))
    }
}

/// A column of a raw table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Key under which this column's values appear in each [`RawRow`].
    pub key: String,
    /// Display label with markup removed.
    pub label: String,
}

/// One row of a raw table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow {
    /// Zero-based position of the row in the source table.
    pub position: usize,
    /// Raw cell values (possibly markup) keyed by column key.
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    /// Returns the raw value for `key`, or `""` when the cell is missing.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.cells.get(key).map_or("", String::as_str)
    }
}

/// A table extracted from a source document, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    /// Columns in display order.
    pub columns: Vec<RawColumn>,
    /// Rows in source order.
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_text_rejects_non_success_status() {
        let fetcher = StaticFetcher::new().with_response("https://src.test/a", 503, "down");
        let err = fetch_text(&fetcher, "https://src.test/a", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn static_fetcher_serves_known_pages_and_404s_the_rest() {
        let fetcher = StaticFetcher::new().with_page("https://src.test/a", "hello");
        let body = fetch_text(&fetcher, "https://src.test/a", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(body, "hello");

        let missing = fetcher
            .fetch("https://src.test/b", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn rejects_invalid_header_names() {
        let headers = BTreeMap::from([("bad header".to_owned(), "x".to_owned())]);
        assert!(matches!(header_map(&headers), Err(ScrapeError::Parse(_))));
    }

    #[test]
    fn missing_cells_read_as_empty() {
        let row = RawRow::default();
        assert_eq!(row.get("anything"), "");
    }
}
