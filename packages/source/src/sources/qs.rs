//! QS World University Rankings (topuniversities.com).
//!
//! Ranking pages do not contain the table. Each page is a content node
//! whose id appears as an attribute of its `<article>` element; the table
//! is a JSON document published under a path derived from that id.

use std::sync::Arc;

use async_trait::async_trait;
use rankr_scraper::json_table::parse_json_table;
use rankr_scraper::markup::find_attribute;
use rankr_scraper::{Fetcher, RawTable};

use super::{ensure_under_base, extractor_mismatch, fetch_document, parse_page_url};
use crate::config::{ExtractorConfig, NODE_ID_PLACEHOLDER, SourceConfig};
use crate::{CrawlError, CrawlStage, RankingSource};

/// QS source: node-id lookup plus JSON column/data tables.
#[derive(Debug)]
pub struct QsSource {
    config: Arc<SourceConfig>,
    node_tag: String,
    node_attribute: String,
    data_path: String,
}

impl QsSource {
    /// Creates the source.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] unless the config uses the
    /// `json_table` extractor.
    pub fn new(config: Arc<SourceConfig>) -> Result<Self, CrawlError> {
        let ExtractorConfig::JsonTable {
            node_tag,
            node_attribute,
            data_path,
        } = &config.extractor
        else {
            return Err(extractor_mismatch(&config, "json_table"));
        };

        Ok(Self {
            node_tag: node_tag.clone(),
            node_attribute: node_attribute.clone(),
            data_path: data_path.clone(),
            config,
        })
    }

    /// Reads the node id out of a ranking page.
    fn node_id(&self, page: &str) -> Result<String, CrawlError> {
        let (tag, attr) = (&self.node_tag, &self.node_attribute);
        let id = &self.config.id;

        let node_id = find_attribute(page, tag, attr)
            .map_err(|e| CrawlError::from_scrape(id, CrawlStage::LocatingSource, e))?
            .ok_or_else(|| {
                CrawlError::structure(
                    id,
                    CrawlStage::LocatingSource,
                    format!("no <{tag} {attr}> element on page"),
                )
            })?;

        if node_id.is_empty() || !node_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(CrawlError::structure(
                id,
                CrawlStage::LocatingSource,
                format!("node id '{node_id}' is not numeric"),
            ));
        }

        Ok(node_id)
    }
}

#[async_trait]
impl RankingSource for QsSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn locate_source(
        &self,
        fetcher: &dyn Fetcher,
        page_url: &str,
    ) -> Result<String, CrawlError> {
        let page_url = parse_page_url(&self.config, page_url)?;
        let page = fetch_document(
            &self.config,
            fetcher,
            page_url.as_str(),
            CrawlStage::LocatingSource,
        )
        .await?;

        let node_id = self.node_id(&page)?;
        log::debug!("[{}] Page node id: {node_id}", self.config.id);

        let path = self.data_path.replace(NODE_ID_PLACEHOLDER, &node_id);
        let data_url = self.config.base()?.join(&path).map_err(|e| {
            CrawlError::structure(
                &self.config.id,
                CrawlStage::LocatingSource,
                format!("cannot build data URL from '{path}': {e}"),
            )
        })?;
        ensure_under_base(&self.config, &data_url)?;

        Ok(data_url.into())
    }

    async fn extract_table(
        &self,
        fetcher: &dyn Fetcher,
        data_url: &str,
    ) -> Result<RawTable, CrawlError> {
        let body = fetch_document(&self.config, fetcher, data_url, CrawlStage::Extracting).await?;
        parse_json_table(&body)
            .map_err(|e| CrawlError::from_scrape(&self.config.id, CrawlStage::Extracting, e))
    }
}

#[cfg(test)]
mod tests {
    use rankr_ranking_models::CanonicalField;
    use rankr_scraper::StaticFetcher;

    use super::*;
    use crate::crawler::Crawler;
    use crate::registry::find_config;

    const PAGE_URL: &str =
        "https://www.topuniversities.com/university-rankings/world-university-rankings/2023";
    const DATA_URL: &str = "https://www.topuniversities.com/sites/default/files/qs-rankings-data/en/3740566_indicators.txt";

    const PAGE: &str = r#"<html><head><title>QS</title></head><body>
        <article data-history-node-id="3740566" class="node node--type-ranking">
          <div id="qs-rankings-datatables"></div>
        </article>
    </body></html>"#;

    fn source() -> QsSource {
        QsSource::new(find_config("qs").unwrap()).unwrap()
    }

    fn data() -> String {
        serde_json::json!({
            "columns": [
                {"title": "Rank", "data": "rank_display"},
                {"title": "<div class=\"td-wrap\">University</div>", "data": "title"},
                {"title": "Country", "data": "country"},
                {"title": "Overall Score", "data": "overall"},
                {"title": "Stars", "data": "stars"},
            ],
            "data": [
                {"rank_display": "1", "title": "<a href='/x'>A U</a>", "country": "Testland", "overall": "100", "stars": "5"},
                {"rank_display": "=2", "title": "<a href=\"/universities/b-u\">B U</a>", "country": null, "overall": "98.1"},
                {"rank_display": "3", "title": "<a href=\"/universities/c-u\">C U</a>", "country": "United Kingdom", "overall": "97"},
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn derives_data_url_from_node_id() {
        let fetcher = StaticFetcher::new().with_page(PAGE_URL, PAGE);
        let url = source().locate_source(&fetcher, PAGE_URL).await.unwrap();
        assert_eq!(url, DATA_URL);
    }

    #[tokio::test]
    async fn locating_is_idempotent() {
        let fetcher = StaticFetcher::new().with_page(PAGE_URL, PAGE);
        let source = source();
        let first = source.locate_source(&fetcher, PAGE_URL).await.unwrap();
        let second = source.locate_source(&fetcher, PAGE_URL).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_node_marker_is_a_structure_error() {
        let fetcher = StaticFetcher::new().with_page(PAGE_URL, "<html><article>x</article></html>");
        let err = source().locate_source(&fetcher, PAGE_URL).await.unwrap_err();
        assert!(matches!(err, CrawlError::Structure { .. }));
        assert_eq!(err.stage(), Some(CrawlStage::LocatingSource));
    }

    #[tokio::test]
    async fn non_numeric_node_id_is_a_structure_error() {
        let page = r#"<article data-history-node-id="abc">x</article>"#;
        let fetcher = StaticFetcher::new().with_page(PAGE_URL, page);
        let err = source().locate_source(&fetcher, PAGE_URL).await.unwrap_err();
        assert!(matches!(err, CrawlError::Structure { .. }));
    }

    #[tokio::test]
    async fn unreachable_page_is_a_transport_error() {
        let err = source()
            .locate_source(&StaticFetcher::new(), PAGE_URL)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_data_is_a_structure_error() {
        let fetcher = StaticFetcher::new().with_page(DATA_URL, r#"{"data": []}"#);
        let err = source().extract_table(&fetcher, DATA_URL).await.unwrap_err();
        assert!(matches!(err, CrawlError::Structure { .. }));
        assert_eq!(err.stage(), Some(CrawlStage::Extracting));
    }

    #[tokio::test]
    async fn crawls_page_into_canonical_records() {
        let fetcher = StaticFetcher::new()
            .with_page(PAGE_URL, PAGE)
            .with_page(DATA_URL, &data());
        let source = source();
        let run = source.config().run_for(2023);
        let mut crawler = Crawler::new(Arc::new(source), Arc::new(fetcher), run);

        let output = crawler.run(PAGE_URL).await.unwrap();
        assert_eq!(output.data_url, DATA_URL);
        assert_eq!(output.stats.rows_in, 3);
        assert_eq!(output.stats.records_out, 3);
        assert_eq!(output.stats.countries_omitted, 1);

        let first = &output.records[0];
        assert_eq!(first.institution, "A U");
        assert_eq!(first.url.as_deref(), Some("https://www.topuniversities.com/x"));
        assert!(first.country.is_none());
        assert_eq!(first.value(CanonicalField::Score), Some("100"));

        let second = &output.records[1];
        assert_eq!(second.value(CanonicalField::Rank), Some("=2"));
        assert!(second.country.is_none());

        let third = &output.records[2];
        assert_eq!(
            third.country.as_ref().map(|c| c.country_code.as_str()),
            Some("GB")
        );

        let row = first.to_row();
        assert_eq!(row["ranking_system"], "qs");
        assert_eq!(row["year"], 2023);
        assert_eq!(row["field"], "All");
        assert!(!row.contains_key("stars"));
    }
}
