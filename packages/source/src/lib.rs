#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ranking source trait, crawl orchestration, and normalization logic.
//!
//! Each ranking publisher implements the [`RankingSource`] trait to define
//! how its data URL is discovered and how the raw table is extracted. The
//! shared [`crawler::Crawler`] drives a source through locating, extracting,
//! and row processing, producing canonical records.

pub mod config;
pub mod crawler;
pub mod export;
pub mod field_map;
pub mod normalize;
pub mod process;
pub mod progress;
pub mod registry;
pub mod sources;

use async_trait::async_trait;
use rankr_ranking_models::{InvalidLink, UnknownCountry};
use rankr_scraper::{Fetcher, RawTable, ScrapeError};
use strum_macros::{AsRefStr, Display};

use crate::config::SourceConfig;

/// Stage of a crawl, in the order a crawl passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum CrawlStage {
    /// Constructed, not yet run.
    Created,
    /// Resolving the page URL into the data URL.
    LocatingSource,
    /// Fetching and parsing the raw table.
    Extracting,
    /// Normalizing raw rows into canonical records.
    ProcessingRows,
    /// Finished successfully.
    Done,
    /// Aborted by a fatal error.
    Failed,
}

/// Errors that abort a crawl.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// A page or data document did not have the expected structure.
    #[error("[{source_id}] structure error while {stage}: {message}")]
    Structure {
        /// Source that failed.
        source_id: String,
        /// Stage at which the failure occurred.
        stage: CrawlStage,
        /// Description of what was missing or malformed.
        message: String,
    },

    /// A request failed or returned a non-success status.
    #[error("[{source_id}] transport error while {stage}: {source}")]
    Transport {
        /// Source that failed.
        source_id: String,
        /// Stage at which the failure occurred.
        stage: CrawlStage,
        /// Underlying transport error.
        #[source]
        source: ScrapeError,
    },

    /// The source definition or crawl parameters are unusable.
    #[error("[{source_id}] configuration error: {message}")]
    Configuration {
        /// Source the configuration belongs to.
        source_id: String,
        /// Description of the problem.
        message: String,
    },

    /// The crawler already ran once.
    #[error("[{source_id}] crawler has already run")]
    AlreadyRun {
        /// Source of the crawler.
        source_id: String,
    },
}

impl CrawlError {
    /// Classifies a [`ScrapeError`] raised at `stage`.
    ///
    /// Request failures and bad statuses are transport errors; documents
    /// that could not be parsed are structure errors.
    #[must_use]
    pub fn from_scrape(source_id: &str, stage: CrawlStage, err: ScrapeError) -> Self {
        match err {
            ScrapeError::Http(_) | ScrapeError::Status { .. } => Self::Transport {
                source_id: source_id.to_owned(),
                stage,
                source: err,
            },
            ScrapeError::Parse(_) | ScrapeError::Json(_) => Self::Structure {
                source_id: source_id.to_owned(),
                stage,
                message: err.to_string(),
            },
        }
    }

    /// Builds a [`CrawlError::Structure`].
    #[must_use]
    pub fn structure(source_id: &str, stage: CrawlStage, message: impl Into<String>) -> Self {
        Self::Structure {
            source_id: source_id.to_owned(),
            stage,
            message: message.into(),
        }
    }

    /// Builds a [`CrawlError::Configuration`].
    #[must_use]
    pub fn configuration(source_id: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            source_id: source_id.to_owned(),
            message: message.into(),
        }
    }

    /// Returns `true` if re-running the whole crawl may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The stage at which the crawl failed, when it had started.
    #[must_use]
    pub const fn stage(&self) -> Option<CrawlStage> {
        match self {
            Self::Structure { stage, .. } | Self::Transport { stage, .. } => Some(*stage),
            Self::Configuration { .. } | Self::AlreadyRun { .. } => None,
        }
    }

    /// The source the error belongs to.
    #[must_use]
    pub fn source_id(&self) -> &str {
        match self {
            Self::Structure { source_id, .. }
            | Self::Transport { source_id, .. }
            | Self::Configuration { source_id, .. }
            | Self::AlreadyRun { source_id } => source_id,
        }
    }
}

/// Row-level failures. These never abort a crawl; the row processor
/// recovers from each one by omitting a field or skipping the row.
#[derive(Debug, thiserror::Error)]
pub enum RowNormalizationError {
    /// The institution cell was empty after cleaning.
    #[error("row {position} has no institution name")]
    MissingInstitution {
        /// Position of the row in the source table.
        position: usize,
    },

    /// The country could not be resolved.
    #[error(transparent)]
    UnknownCountry(#[from] UnknownCountry),

    /// The institution link is not a usable absolute URL.
    #[error("invalid institution URL '{href}': {source}")]
    InvalidUrl {
        /// The href as it appeared in the cell.
        href: String,
        /// Validation failure.
        #[source]
        source: InvalidLink,
    },
}

/// Capability every ranking publisher implements.
///
/// Implementations hold their [`SourceConfig`] and perform no retries;
/// transport concerns belong to the [`Fetcher`].
#[async_trait]
pub trait RankingSource: Send + Sync {
    /// The definition this source was built from.
    fn config(&self) -> &SourceConfig;

    /// Returns the unique identifier of this source (e.g., `"qs"`).
    fn id(&self) -> &str {
        &self.config().id
    }

    /// Resolves a human-facing page URL into the URL of the actual data
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Transport`] if the page cannot be fetched, or
    /// [`CrawlError::Structure`] if the page lacks the expected markers.
    async fn locate_source(
        &self,
        fetcher: &dyn Fetcher,
        page_url: &str,
    ) -> Result<String, CrawlError>;

    /// Fetches the data document and parses it into raw rows.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Transport`] if the document cannot be fetched,
    /// or [`CrawlError::Structure`] if it does not have the expected shape.
    async fn extract_table(
        &self,
        fetcher: &dyn Fetcher,
        data_url: &str,
    ) -> Result<RawTable, CrawlError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        let err = CrawlError::from_scrape(
            "qs",
            CrawlStage::LocatingSource,
            ScrapeError::Status {
                url: "https://src.test".to_owned(),
                status: 503,
            },
        );
        assert!(err.is_retryable());
        assert_eq!(err.stage(), Some(CrawlStage::LocatingSource));
        assert_eq!(err.source_id(), "qs");
    }

    #[test]
    fn parse_errors_become_structure_errors() {
        let err = CrawlError::from_scrape(
            "the",
            CrawlStage::Extracting,
            ScrapeError::Parse("no table".to_owned()),
        );
        assert!(matches!(err, CrawlError::Structure { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("while extracting"));
    }

    #[test]
    fn configuration_errors_have_no_stage() {
        let err = CrawlError::configuration("wikipedia", "bad base URL");
        assert_eq!(err.stage(), None);
        assert!(!err.is_retryable());
    }
}
