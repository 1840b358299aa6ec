//! Crawl orchestration shared by every ranking source.
//!
//! A [`Crawler`] walks one source through
//! `Created → LocatingSource → Extracting → ProcessingRows → Done`. A fatal
//! error while locating or extracting moves it to `Failed`. Row processing
//! cannot fail; row-level problems are only counted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rankr_ranking_models::{CanonicalRecord, RankingRun};
use rankr_scraper::Fetcher;

use crate::field_map::FieldMapper;
use crate::process::{RowStats, process_rows};
use crate::progress::{ProgressCallback, null_progress};
use crate::{CrawlError, CrawlStage, RankingSource};

/// Result of a successful crawl.
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    /// Source that was crawled.
    pub source_id: String,
    /// Run metadata attached to every record.
    pub run: RankingRun,
    /// The data URL the table was read from.
    pub data_url: String,
    /// Canonical records in source order.
    pub records: Vec<CanonicalRecord>,
    /// Row counters.
    pub stats: RowStats,
    /// When the crawl finished.
    pub crawled_at: DateTime<Utc>,
}

/// Runs a single crawl of one source.
///
/// A crawler runs at most once; create a new one to crawl again.
pub struct Crawler {
    source: Arc<dyn RankingSource>,
    fetcher: Arc<dyn Fetcher>,
    run: RankingRun,
    stage: CrawlStage,
    progress: Arc<dyn ProgressCallback>,
}

impl Crawler {
    /// Creates a crawler in the [`CrawlStage::Created`] stage.
    #[must_use]
    pub fn new(source: Arc<dyn RankingSource>, fetcher: Arc<dyn Fetcher>, run: RankingRun) -> Self {
        Self {
            source,
            fetcher,
            run,
            stage: CrawlStage::Created,
            progress: null_progress(),
        }
    }

    /// Reports row progress and stage changes to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// The current stage.
    #[must_use]
    pub const fn stage(&self) -> CrawlStage {
        self.stage
    }

    /// The run metadata this crawler attaches to records.
    #[must_use]
    pub const fn run_metadata(&self) -> &RankingRun {
        &self.run
    }

    /// Identifier of the crawled source.
    #[must_use]
    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    fn transition(&mut self, next: CrawlStage) {
        log::debug!("[{}] {} -> {next}", self.source.id(), self.stage);
        self.stage = next;
        self.progress.set_message(format!("{}: {next}", self.source.id()));
    }

    /// Runs the crawl starting from the human-facing `page_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::AlreadyRun`] if this crawler has run before,
    /// [`CrawlError::Configuration`] if the source's base URL is unusable,
    /// and whatever the source reports while locating or extracting.
    pub async fn run(&mut self, page_url: &str) -> Result<CrawlOutput, CrawlError> {
        let source = Arc::clone(&self.source);
        let source_id = source.id().to_owned();

        if self.stage != CrawlStage::Created {
            return Err(CrawlError::AlreadyRun { source_id });
        }

        let config = source.config();
        let base = config.base()?;
        let mapper = FieldMapper::from_config(config);

        // ── Locate the data document ────────────────────────────────────
        self.transition(CrawlStage::LocatingSource);
        log::info!("[{source_id}] Locating data source for {page_url}");
        let data_url = match source.locate_source(self.fetcher.as_ref(), page_url).await {
            Ok(url) => url,
            Err(e) => {
                self.transition(CrawlStage::Failed);
                return Err(e);
            }
        };
        log::info!("[{source_id}] Data source: {data_url}");

        // ── Extract the raw table ───────────────────────────────────────
        self.transition(CrawlStage::Extracting);
        let table = match source.extract_table(self.fetcher.as_ref(), &data_url).await {
            Ok(table) => table,
            Err(e) => {
                self.transition(CrawlStage::Failed);
                return Err(e);
            }
        };
        log::info!(
            "[{source_id}] Extracted {} rows, {} columns",
            table.len(),
            table.columns.len()
        );

        // ── Normalize rows ──────────────────────────────────────────────
        self.transition(CrawlStage::ProcessingRows);
        let processed = process_rows(&table, &mapper, &base, &self.run, self.progress.as_ref());
        let stats = processed.stats;

        if stats.rows_skipped > 0 || stats.countries_omitted > 0 || stats.urls_omitted > 0 {
            log::warn!(
                "[{source_id}] {} rows skipped, {} countries omitted, {} URLs omitted",
                stats.rows_skipped,
                stats.countries_omitted,
                stats.urls_omitted
            );
        }
        log::info!(
            "[{source_id}] Normalized {}/{} rows",
            stats.records_out,
            stats.rows_in
        );

        self.transition(CrawlStage::Done);

        Ok(CrawlOutput {
            source_id,
            run: self.run.clone(),
            data_url,
            records: processed.records,
            stats,
            crawled_at: Utc::now(),
        })
    }
}
