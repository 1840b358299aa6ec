//! Shanghai Academic Ranking of World Universities (shanghairanking.com).
//!
//! The ranking page is the data document: an HTML table whose country
//! column shows flag images rather than names.

use std::sync::Arc;

use async_trait::async_trait;
use rankr_scraper::html_table::HtmlTableParser;
use rankr_scraper::{Fetcher, RawTable};

use super::{fetch_document, html_parser, parse_page_url};
use crate::config::SourceConfig;
use crate::{CrawlError, CrawlStage, RankingSource};

/// Shanghai ARWU source.
#[derive(Debug)]
pub struct ShanghaiSource {
    config: Arc<SourceConfig>,
    parser: HtmlTableParser,
}

impl ShanghaiSource {
    /// Creates the source.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] unless the config uses the
    /// `html_table` extractor.
    pub fn new(config: Arc<SourceConfig>) -> Result<Self, CrawlError> {
        let parser = html_parser(&config)?;
        Ok(Self { config, parser })
    }
}

#[async_trait]
impl RankingSource for ShanghaiSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn locate_source(
        &self,
        _fetcher: &dyn Fetcher,
        page_url: &str,
    ) -> Result<String, CrawlError> {
        Ok(parse_page_url(&self.config, page_url)?.into())
    }

    async fn extract_table(
        &self,
        fetcher: &dyn Fetcher,
        data_url: &str,
    ) -> Result<RawTable, CrawlError> {
        let body = fetch_document(&self.config, fetcher, data_url, CrawlStage::Extracting).await?;
        self.parser
            .parse(&body)
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

    const PAGE_URL: &str = "https://www.shanghairanking.com/rankings/arwu/2023";

    const PAGE: &str = r#"<html><body>
        <table class="rk-table">
          <thead><tr>
            <th>World Rank</th><th>Institution</th><th>Country/Region</th>
            <th>National/Regional Rank</th><th>Total Score</th><th>Alumni</th>
          </tr></thead>
          <tbody>
            <tr>
              <td><div class="ranking">1</div></td>
              <td><div class="link-container"><a href="/institution/harvard-university">
                <span class="univ-name">Harvard University</span></a></div></td>
              <td><div class="region-img" style="background-image: url(/_nuxt/img/us.png)">
                <img src="/_nuxt/img/us.png" title="United States" alt=""></div></td>
              <td>1</td><td>100</td><td>100</td>
            </tr>
            <tr>
              <td>101-150</td>
              <td><a href="/institution/unknown">Nowhere Institute</a></td>
              <td><img src="/flags/xx.png" title="Atlantis"></td>
              <td>3-5</td><td></td><td>12.3</td>
            </tr>
          </tbody>
        </table></body></html>"#;

    fn source() -> ShanghaiSource {
        ShanghaiSource::new(find_config("shanghai").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn page_is_its_own_data_source() {
        let url = source()
            .locate_source(&StaticFetcher::new(), PAGE_URL)
            .await
            .unwrap();
        assert_eq!(url, PAGE_URL);
    }

    #[tokio::test]
    async fn invalid_page_url_is_a_structure_error() {
        let err = source()
            .locate_source(&StaticFetcher::new(), "not a url")
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Structure { .. }));
    }

    #[tokio::test]
    async fn page_without_table_is_a_structure_error() {
        let fetcher = StaticFetcher::new().with_page(PAGE_URL, "<html><body></body></html>");
        let err = source().extract_table(&fetcher, PAGE_URL).await.unwrap_err();
        assert_eq!(err.stage(), Some(CrawlStage::Extracting));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn crawls_flag_countries_and_indicators() {
        let fetcher = StaticFetcher::new().with_page(PAGE_URL, PAGE);
        let source = source();
        let run = source.config().run_for(2023);
        let mut crawler = Crawler::new(Arc::new(source), Arc::new(fetcher), run);

        let output = crawler.run(PAGE_URL).await.unwrap();
        assert_eq!(output.records.len(), 2);

        let harvard = &output.records[0];
        assert_eq!(harvard.institution, "Harvard University");
        assert_eq!(
            harvard.url.as_deref(),
            Some("https://www.shanghairanking.com/institution/harvard-university")
        );
        assert_eq!(
            harvard.country.as_ref().map(|c| c.country.as_str()),
            Some("United States")
        );
        assert_eq!(harvard.value(CanonicalField::Rank), Some("1"));
        assert_eq!(harvard.value(CanonicalField::NationalRank), Some("1"));
        assert_eq!(harvard.value(CanonicalField::Score), Some("100"));
        assert_eq!(harvard.value(CanonicalField::Alumni), Some("100"));

        let other = &output.records[1];
        assert!(other.country.is_none());
        assert_eq!(other.value(CanonicalField::Score), None);
        assert_eq!(other.value(CanonicalField::Rank), Some("101-150"));
        assert_eq!(output.stats.countries_omitted, 1);
    }
}
