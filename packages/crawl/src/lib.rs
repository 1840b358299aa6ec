#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library behind the `rankr_crawl` binary: builds crawl requests from
//! source definitions, runs crawls with whole-crawl retries, and exports
//! the results.

pub mod interactive;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rankr_cli_utils::{IndicatifProgress, MultiProgress};
use rankr_ranking_models::RankingRun;
use rankr_scraper::{Fetcher, HttpFetcher, ScrapeError};
use rankr_source::CrawlError;
use rankr_source::config::SourceConfig;
use rankr_source::crawler::{CrawlOutput, Crawler};
use rankr_source::export::{ExportError, ExportFormat, file_stem, write_records};
use rankr_source::progress::{ProgressCallback, null_progress};
use rankr_source::registry::build_source;

/// Environment variable overriding the export root directory.
pub const DOWNLOAD_DIR_ENV: &str = "RANKR_DOWNLOAD_DIR";

/// Per-request timeout of the HTTP transport.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A crawl failed.
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    /// Writing results failed.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Transport(#[from] ScrapeError),

    /// The source has no page URL template and none was given.
    #[error("Source '{source_id}' has no page URL template; pass --url")]
    MissingPageUrl {
        /// Source lacking a template.
        source_id: String,
    },

    /// One or more sources failed during a multi-source crawl.
    #[error("{} source(s) failed: {}", failed.len(), failed.join(", "))]
    SourcesFailed {
        /// Ids of the failed sources.
        failed: Vec<String>,
    },

    /// An interactive prompt failed.
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Everything needed to run one crawl.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Source definition.
    pub config: Arc<SourceConfig>,
    /// Page URL the crawl starts from.
    pub page_url: String,
    /// Run metadata attached to every record.
    pub run: RankingRun,
}

impl CrawlRequest {
    /// Builds an overall-ranking request for `year`, using `page_url` if
    /// given and the source's page template otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::MissingPageUrl`] if there is neither.
    pub fn new(
        config: Arc<SourceConfig>,
        year: u16,
        page_url: Option<String>,
    ) -> Result<Self, CliError> {
        let page_url = page_url
            .or_else(|| config.page_url_for(year))
            .ok_or_else(|| CliError::MissingPageUrl {
                source_id: config.id.clone(),
            })?;
        let run = config.run_for(year);
        Ok(Self {
            config,
            page_url,
            run,
        })
    }

    /// Replaces the run metadata (e.g. for subject rankings).
    #[must_use]
    pub fn with_run(mut self, run: RankingRun) -> Self {
        self.run = run;
        self
    }
}

/// How many times a whole crawl is retried after a transport failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Backoff unit. Retry `n` waits `base_delay * 2^n`, so the first
    /// retry waits twice this.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy with `retries` retries and a one-second base delay.
    #[must_use]
    pub const fn new(retries: u32) -> Self {
        Self {
            retries,
            base_delay: Duration::from_secs(1),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(16))
    }
}

/// Where and how to write results.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output directory; falls back to [`resolve_output_dir`] rules.
    pub output_dir: Option<PathBuf>,
    /// Output format.
    pub format: ExportFormat,
}

/// Builds the shared HTTP transport.
///
/// # Errors
///
/// Returns [`CliError::Transport`] if the client cannot be built.
pub fn http_fetcher() -> Result<Arc<dyn Fetcher>, CliError> {
    Ok(Arc::new(HttpFetcher::new(REQUEST_TIMEOUT)?))
}

/// Picks the export directory for a source: the explicit directory, else
/// `$RANKR_DOWNLOAD_DIR/<source id>`, else the source's configured
/// directory, else `data/<source id>`.
#[must_use]
pub fn resolve_output_dir(
    explicit: Option<&Path>,
    env_root: Option<&Path>,
    config: &SourceConfig,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(root) = env_root {
        return root.join(&config.id);
    }
    config
        .download_dir
        .clone()
        .unwrap_or_else(|| Path::new("data").join(&config.id))
}

/// Runs a crawl, retrying the whole crawl on retryable failures with
/// exponential backoff.
///
/// # Errors
///
/// Returns the last [`CrawlError`] once retries are exhausted, or the first
/// non-retryable one.
pub async fn crawl_with_retry(
    request: &CrawlRequest,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    progress: Arc<dyn ProgressCallback>,
) -> Result<CrawlOutput, CrawlError> {
    let source_id = &request.config.id;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!(
                "[{source_id}] retry {attempt}/{} in {delay:?}...",
                policy.retries
            );
            tokio::time::sleep(delay).await;
        }

        let source = build_source(Arc::clone(&request.config))?;
        let mut crawler = Crawler::new(source, Arc::clone(&fetcher), request.run.clone())
            .with_progress(Arc::clone(&progress));

        match crawler.run(&request.page_url).await {
            Ok(output) => return Ok(output),
            Err(e) if e.is_retryable() && attempt < policy.retries => {
                log::warn!("[{source_id}] transient failure: {e}");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Crawls one source and exports the records. Returns the written file.
///
/// # Errors
///
/// Returns [`CliError`] if the crawl or the export fails.
pub async fn crawl_and_export(
    request: &CrawlRequest,
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    export: &ExportOptions,
    progress: Arc<dyn ProgressCallback>,
) -> Result<PathBuf, CliError> {
    let start = Instant::now();
    let output = match crawl_with_retry(request, fetcher, policy, Arc::clone(&progress)).await {
        Ok(output) => output,
        Err(e) => {
            progress.finish_and_clear();
            return Err(e.into());
        }
    };

    let env_root = std::env::var_os(DOWNLOAD_DIR_ENV).map(PathBuf::from);
    let dir = resolve_output_dir(
        export.output_dir.as_deref(),
        env_root.as_deref(),
        &request.config,
    );
    let path = write_records(&output.records, &dir, &file_stem(&output), export.format)?;

    progress.finish(format!(
        "{}: {} records",
        output.source_id, output.stats.records_out
    ));
    log::info!(
        "[{}] Done: {}/{} rows -> {} in {:.1}s",
        output.source_id,
        output.stats.records_out,
        output.stats.rows_in,
        path.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(path)
}

/// Crawls several sources concurrently. A failing source does not stop the
/// others; results are returned per source in request order.
pub async fn crawl_all(
    requests: &[CrawlRequest],
    fetcher: &Arc<dyn Fetcher>,
    policy: RetryPolicy,
    export: &ExportOptions,
    multi: Option<&MultiProgress>,
) -> Vec<(String, Result<PathBuf, CliError>)> {
    let overall = multi.map_or_else(null_progress, |m| {
        IndicatifProgress::sources_bar(m, requests.len() as u64)
    });

    let tasks = requests.iter().map(|request| {
        let progress =
            multi.map_or_else(null_progress, |m| IndicatifProgress::rows_bar(m, &request.config.id));
        let overall = Arc::clone(&overall);
        let fetcher = Arc::clone(fetcher);
        async move {
            let result = crawl_and_export(request, fetcher, policy, export, progress).await;
            overall.inc(1);
            (request.config.id.clone(), result)
        }
    });

    let results = join_all(tasks).await;
    overall.finish("Crawl complete".to_owned());
    results
}

/// Logs per-source outcomes and turns any failure into
/// [`CliError::SourcesFailed`].
///
/// # Errors
///
/// Returns [`CliError::SourcesFailed`] naming every failed source.
pub fn summarize(results: Vec<(String, Result<PathBuf, CliError>)>) -> Result<(), CliError> {
    let mut failed = Vec::new();
    for (source_id, result) in results {
        match result {
            Ok(path) => log::info!("[{source_id}] wrote {}", path.display()),
            Err(e) => {
                log::error!("[{source_id}] failed: {e}");
                failed.push(source_id);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::SourcesFailed { failed })
    }
}
