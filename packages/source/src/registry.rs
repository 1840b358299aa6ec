//! Source registry: loads all source definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a publisher means adding a
//! TOML file here and a [`RankingSource`] implementation in
//! [`crate::sources`].

use std::sync::Arc;

use rankr_ranking_models::RankingSystem;

use crate::config::SourceConfig;
use crate::sources::qs::QsSource;
use crate::sources::shanghai::ShanghaiSource;
use crate::sources::the::TheSource;
use crate::sources::wikipedia::WikipediaSource;
use crate::{CrawlError, RankingSource};

/// Environment variable holding a comma-separated source id filter.
pub const SOURCES_ENV: &str = "RANKR_SOURCES";

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("qs", include_str!("../sources/qs.toml")),
    ("shanghai", include_str!("../sources/shanghai.toml")),
    ("the", include_str!("../sources/the.toml")),
    ("wikipedia", include_str!("../sources/wikipedia.toml")),
];

/// Parses and validates every embedded source definition.
///
/// # Errors
///
/// Returns [`CrawlError::Configuration`] if any definition is malformed or
/// fails validation.
pub fn all_configs() -> Result<Vec<Arc<SourceConfig>>, CrawlError> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            let config = SourceConfig::from_toml(name, toml)?;
            config.validate()?;
            Ok(Arc::new(config))
        })
        .collect()
}

/// Looks up one source definition by id.
///
/// # Errors
///
/// Returns [`CrawlError::Configuration`] if the id is unknown or the
/// definitions fail to load.
pub fn find_config(id: &str) -> Result<Arc<SourceConfig>, CrawlError> {
    let configs = all_configs()?;
    let available = configs
        .iter()
        .map(|c| c.id.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    configs
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or_else(|| {
            CrawlError::configuration(id, format!("unknown source. Available: {available}"))
        })
}

/// Returns the sources to crawl, filtered by the `--sources` CLI flag or
/// the `RANKR_SOURCES` environment variable. If neither is set, all
/// sources are returned.
///
/// # Errors
///
/// Returns [`CrawlError::Configuration`] if the definitions fail to load.
pub fn enabled_configs(cli_filter: Option<String>) -> Result<Vec<Arc<SourceConfig>>, CrawlError> {
    let filter = cli_filter.or_else(|| std::env::var(SOURCES_ENV).ok());
    let all = all_configs()?;

    let Some(filter_str) = filter else {
        return Ok(all);
    };

    Ok(filter_configs(all, &filter_str))
}

/// Keeps the configs whose id appears in a comma-separated filter.
fn filter_configs(all: Vec<Arc<SourceConfig>>, filter: &str) -> Vec<Arc<SourceConfig>> {
    let ids: Vec<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    let available = all
        .iter()
        .map(|c| c.id.clone())
        .collect::<Vec<_>>()
        .join(", ");

    let filtered: Vec<Arc<SourceConfig>> = all
        .into_iter()
        .filter(|c| ids.contains(&c.id.as_str()))
        .collect();

    if filtered.is_empty() {
        log::warn!("No matching sources found for filter {ids:?}. Available: {available}");
    }

    filtered
}

/// Builds the [`RankingSource`] implementation for a definition.
///
/// # Errors
///
/// Returns [`CrawlError::Configuration`] if the definition's extractor does
/// not suit its ranking system.
pub fn build_source(config: Arc<SourceConfig>) -> Result<Arc<dyn RankingSource>, CrawlError> {
    Ok(match config.ranking_system {
        RankingSystem::Qs => Arc::new(QsSource::new(config)?),
        RankingSystem::Shanghai => Arc::new(ShanghaiSource::new(config)?),
        RankingSystem::The => Arc::new(TheSource::new(config)?),
        RankingSystem::Wikipedia => Arc::new(WikipediaSource::new(config)?),
    })
}
