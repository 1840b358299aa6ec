//! Times Higher Education World University Rankings.
//!
//! The ranking page is the data document. Its name column packs the
//! institution link and a `.location` block into one cell; extraction
//! splits that cell into separate name and location columns so the field
//! mapper sees them independently.

use std::sync::Arc;

use async_trait::async_trait;
use rankr_scraper::html_table::HtmlTableParser;
use rankr_scraper::markup::{
    anchor_markup, escape_text, first_anchor_outside, select_text, strip_markup,
};
use rankr_scraper::{Fetcher, RawColumn, RawTable, ScrapeError};

use super::{fetch_document, html_parser, parse_page_url};
use crate::config::{ExtractorConfig, SourceConfig};
use crate::field_map::normalize_label;
use crate::{CrawlError, CrawlStage, RankingSource};

/// Selector of the location block inside the combined name cell.
const LOCATION_SELECTOR: &str = ".location";

/// THE source.
#[derive(Debug)]
pub struct TheSource {
    config: Arc<SourceConfig>,
    parser: HtmlTableParser,
    split_column: Option<String>,
}

impl TheSource {
    /// Creates the source.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] unless the config uses the
    /// `html_table` extractor.
    pub fn new(config: Arc<SourceConfig>) -> Result<Self, CrawlError> {
        let parser = html_parser(&config)?;
        let split_column = match &config.extractor {
            ExtractorConfig::HtmlTable {
                split_location_column,
                ..
            } => split_location_column.as_deref().map(normalize_label),
            ExtractorConfig::JsonTable { .. } | ExtractorConfig::Wikitext { .. } => None,
        };
        Ok(Self {
            config,
            parser,
            split_column,
        })
    }

    /// Splits the combined name/location column, if configured and present.
    fn split_location(&self, mut table: RawTable) -> Result<RawTable, ScrapeError> {
        let Some(split_label) = &self.split_column else {
            return Ok(table);
        };
        let Some(index) = table
            .columns
            .iter()
            .position(|c| normalize_label(&c.label) == *split_label)
        else {
            log::warn!(
                "[{}] Column '{split_label}' not found, leaving table unsplit",
                self.config.id
            );
            return Ok(table);
        };

        let key = table.columns[index].key.clone();
        let location_key = format!("{key}_location");
        "Name".clone_into(&mut table.columns[index].label);
        table.columns.insert(
            index + 1,
            RawColumn {
                key: location_key.clone(),
                label: "Location".to_owned(),
            },
        );

        for row in &mut table.rows {
            let raw = row.get(&key).to_owned();
            let location = select_text(&raw, LOCATION_SELECTOR)?.unwrap_or_default();

            let name = match first_anchor_outside(&raw, LOCATION_SELECTOR)? {
                Some(anchor) if !anchor.text.is_empty() => {
                    anchor_markup(&anchor.text, anchor.href.as_deref())
                }
                _ => escape_text(strip_markup(&raw).replacen(&location, "", 1).trim()),
            };

            row.cells.insert(key.clone(), name);
            row.cells.insert(location_key.clone(), escape_text(&location));
        }

        Ok(table)
    }
}

#[async_trait]
impl RankingSource for TheSource {
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
            .and_then(|table| self.split_location(table))
            .map_err(|e| CrawlError::from_scrape(&self.config.id, CrawlStage::Extracting, e))
    }
}
