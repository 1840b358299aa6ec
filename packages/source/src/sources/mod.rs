//! One [`RankingSource`](crate::RankingSource) implementation per ranking
//! publisher, plus the helpers they share.

pub mod qs;
pub mod shanghai;
pub mod the;
pub mod wikipedia;

use rankr_scraper::html_table::HtmlTableParser;
use rankr_scraper::{Fetcher, fetch_text};
use url::Url;

use crate::config::{ExtractorConfig, SourceConfig};
use crate::{CrawlError, CrawlStage};

/// Fetches `url` with the source's headers, classifying failures for
/// `stage`.
async fn fetch_document(
    config: &SourceConfig,
    fetcher: &dyn Fetcher,
    url: &str,
    stage: CrawlStage,
) -> Result<String, CrawlError> {
    fetch_text(fetcher, url, &config.headers)
        .await
        .map_err(|e| CrawlError::from_scrape(&config.id, stage, e))
}

/// Parses a page URL given to `locate_source`, requiring an absolute
/// http(s) URL.
fn parse_page_url(config: &SourceConfig, page_url: &str) -> Result<Url, CrawlError> {
    let url = Url::parse(page_url.trim()).map_err(|e| {
        CrawlError::structure(
            &config.id,
            CrawlStage::LocatingSource,
            format!("page URL '{page_url}' is invalid: {e}"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CrawlError::structure(
            &config.id,
            CrawlStage::LocatingSource,
            format!("page URL '{page_url}' is not http(s)"),
        ));
    }
    Ok(url)
}

/// Requires a page or derived URL to stay on the source's base domain.
fn ensure_under_base(config: &SourceConfig, url: &Url) -> Result<(), CrawlError> {
    let base = config.base()?;
    if url.host_str() != base.host_str() {
        return Err(CrawlError::structure(
            &config.id,
            CrawlStage::LocatingSource,
            format!("URL '{url}' is not under {base}"),
        ));
    }
    Ok(())
}

/// Error for a source constructed with the wrong extractor kind.
fn extractor_mismatch(config: &SourceConfig, expected: &str) -> CrawlError {
    CrawlError::configuration(
        &config.id,
        format!(
            "expected a {expected} extractor, found {}",
            config.extractor.kind()
        ),
    )
}

/// Builds an HTML table parser from an `html_table` extractor config.
fn html_parser(config: &SourceConfig) -> Result<HtmlTableParser, CrawlError> {
    let ExtractorConfig::HtmlTable {
        table_selector,
        header_selector,
        row_selector,
        cell_selector,
        ..
    } = &config.extractor
    else {
        return Err(extractor_mismatch(config, "html_table"));
    };

    let mut parser = HtmlTableParser::new();
    if let Some(selector) = table_selector {
        parser = parser.with_table_selector(selector);
    }
    if let Some(selector) = header_selector {
        parser = parser.with_header_selector(selector);
    }
    if let Some(selector) = row_selector {
        parser = parser.with_row_selector(selector);
    }
    if let Some(selector) = cell_selector {
        parser = parser.with_cell_selector(selector);
    }
    Ok(parser)
}
