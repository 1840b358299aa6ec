//! Ranking tables maintained on Wikipedia.
//!
//! Article pages are resolved to their raw wikitext
//! (`/w/index.php?title=<Title>&action=raw`), which is far more stable to
//! parse than the rendered HTML.

use std::sync::Arc;

use async_trait::async_trait;
use rankr_scraper::wikitext::parse_wikitext_table;
use rankr_scraper::{Fetcher, RawTable};

use super::{ensure_under_base, extractor_mismatch, fetch_document, parse_page_url};
use crate::config::{ExtractorConfig, SourceConfig};
use crate::{CrawlError, CrawlStage, RankingSource};

/// Path prefix of article pages.
const ARTICLE_PREFIX: &str = "/wiki/";

/// Script that serves raw page sources.
const INDEX_PATH: &str = "/w/index.php";

/// Wikipedia source.
#[derive(Debug)]
pub struct WikipediaSource {
    config: Arc<SourceConfig>,
    table_index: usize,
}

impl WikipediaSource {
    /// Creates the source.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] unless the config uses the
    /// `wikitext` extractor.
    pub fn new(config: Arc<SourceConfig>) -> Result<Self, CrawlError> {
        let ExtractorConfig::Wikitext { table_index } = &config.extractor else {
            return Err(extractor_mismatch(&config, "wikitext"));
        };
        let table_index = table_index.unwrap_or(0);
        Ok(Self {
            config,
            table_index,
        })
    }
}

#[async_trait]
impl RankingSource for WikipediaSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn locate_source(
        &self,
        _fetcher: &dyn Fetcher,
        page_url: &str,
    ) -> Result<String, CrawlError> {
        let page = parse_page_url(&self.config, page_url)?;
        ensure_under_base(&self.config, &page)?;

        let structure = |message: String| {
            CrawlError::structure(&self.config.id, CrawlStage::LocatingSource, message)
        };
        let encoded = page
            .path()
            .strip_prefix(ARTICLE_PREFIX)
            .filter(|title| !title.is_empty())
            .ok_or_else(|| {
                structure(format!(
                    "'{page_url}' is not a {ARTICLE_PREFIX}<Title> article URL"
                ))
            })?;
        let title = urlencoding::decode(encoded)
            .map_err(|e| structure(format!("article title '{encoded}' is not UTF-8: {e}")))?;

        let mut data_url = self
            .config
            .base()?
            .join(INDEX_PATH)
            .map_err(|e| structure(e.to_string()))?;
        data_url
            .query_pairs_mut()
            .append_pair("title", &title)
            .append_pair("action", "raw");
        ensure_under_base(&self.config, &data_url)?;

        Ok(data_url.into())
    }

    async fn extract_table(
        &self,
        fetcher: &dyn Fetcher,
        data_url: &str,
    ) -> Result<RawTable, CrawlError> {
        let body = fetch_document(&self.config, fetcher, data_url, CrawlStage::Extracting).await?;
        parse_wikitext_table(&body, self.table_index)
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

    const PAGE_URL: &str = "https://en.wikipedia.org/wiki/List_of_universities_(rankings)";
    const DATA_URL: &str =
        "https://en.wikipedia.org/w/index.php?title=List_of_universities_%28rankings%29&action=raw";

    const ARTICLE: &str = r#"
'''Rankings''' of universities.<ref>{{cite web|url=https://x.test}}</ref>

{| class="wikitable sortable"
|+ Top universities
! Rank !! Institution !! Country
|-
| 1 || [[Harvard University]] || {{flag|United States}}
|-
| style="text-align:center" | 2 || [[University of Cambridge|Cambridge]]<ref>note</ref> || {{flagcountry|United Kingdom}}
|-
| 3 || || {{flag|Testland}}
|}
"#;

    fn source() -> WikipediaSource {
        WikipediaSource::new(find_config("wikipedia").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn resolves_article_to_raw_wikitext() {
        let url = source()
            .locate_source(&StaticFetcher::new(), PAGE_URL)
            .await
            .unwrap();
        assert_eq!(url, DATA_URL);
    }

    #[tokio::test]
    async fn non_article_url_is_a_structure_error() {
        let err = source()
            .locate_source(&StaticFetcher::new(), "https://en.wikipedia.org/w/index.php")
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Structure { .. }));
        assert_eq!(err.stage(), Some(CrawlStage::LocatingSource));
    }

    #[tokio::test]
    async fn reserved_characters_in_titles_stay_in_the_title() {
        let url = source()
            .locate_source(
                &StaticFetcher::new(),
                "https://en.wikipedia.org/wiki/Texas_A&M_University",
            )
            .await
            .unwrap();
        let url = url::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("title".to_owned(), "Texas_A&M_University".to_owned()),
                ("action".to_owned(), "raw".to_owned()),
            ]
        );

        let url = source()
            .locate_source(
                &StaticFetcher::new(),
                "https://en.wikipedia.org/wiki/%C3%89cole_normale_sup%C3%A9rieure",
            )
            .await
            .unwrap();
        let url = url::Url::parse(&url).unwrap();
        assert_eq!(
            url.query_pairs().next().map(|(_, title)| title.into_owned()),
            Some("\u{c9}cole_normale_sup\u{e9}rieure".to_owned())
        );
    }

    #[tokio::test]
    async fn article_on_another_wiki_is_a_structure_error() {
        let err = source()
            .locate_source(&StaticFetcher::new(), "https://de.wikipedia.org/wiki/Hochschule")
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Structure { .. }));
    }

    #[tokio::test]
    async fn crawls_wikitable_rows() {
        let fetcher = StaticFetcher::new().with_page(DATA_URL, ARTICLE);
        let source = source();
        let run = source.config().run_for(2024);
        let mut crawler = Crawler::new(Arc::new(source), Arc::new(fetcher), run);

        let output = crawler.run(PAGE_URL).await.unwrap();
        assert_eq!(output.stats.rows_in, 3);
        assert_eq!(output.stats.rows_skipped, 1);

        let harvard = &output.records[0];
        assert_eq!(harvard.institution, "Harvard University");
        assert_eq!(
            harvard.url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Harvard_University")
        );
        assert_eq!(
            harvard.country.as_ref().map(|c| c.country_code.as_str()),
            Some("US")
        );

        let cambridge = &output.records[1];
        assert_eq!(cambridge.institution, "Cambridge");
        assert_eq!(cambridge.value(CanonicalField::Rank), Some("2"));
        assert_eq!(
            cambridge.country.as_ref().map(|c| c.country_code.as_str()),
            Some("GB")
        );
    }
}
