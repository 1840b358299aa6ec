//! Config-driven ranking source definition.
//!
//! [`SourceConfig`] captures everything unique about a ranking publisher in
//! a serializable struct: where its pages live, which headers to send, how
//! its columns map onto [`CanonicalField`]s, and which extractor reads its
//! data document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rankr_ranking_models::{CanonicalField, RankingRun, RankingSystem};
use serde::Deserialize;
use url::Url;

use crate::CrawlError;

/// Placeholder substituted with the edition year in page URL templates.
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Placeholder substituted with the page's node id in QS data paths.
pub const NODE_ID_PLACEHOLDER: &str = "{node_id}";

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven ranking source definition.
///
/// Loaded from TOML files embedded at compile time (see
/// [`crate::registry`]).
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Unique identifier (e.g., `"qs"`).
    pub id: String,
    /// Human-readable name (e.g., `"QS World University Rankings"`).
    pub name: String,
    /// Publisher recorded in every record's run metadata.
    pub ranking_system: RankingSystem,
    /// Base URL that relative links and derived data URLs resolve against.
    pub base_url: String,
    /// Page URL template with a `{year}` placeholder. Sources without one
    /// must be crawled with an explicit page URL.
    #[serde(default)]
    pub page_url: Option<String>,
    /// Extra HTTP headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Source column label → canonical field. Keys are matched after the
    /// same normalization applied to scraped labels.
    #[serde(default)]
    pub fields: BTreeMap<String, CanonicalField>,
    /// Substrings that mark an otherwise unmapped column as the institution
    /// column (e.g. `"university"` matches `"University Name"`).
    #[serde(default)]
    pub institution_markers: Vec<String>,
    /// How the data document is parsed.
    pub extractor: ExtractorConfig,
    /// Where exported records are written when no directory is given on the
    /// command line.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

// ── Extractor config ─────────────────────────────────────────────────────

/// How to read the raw table out of the data document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractorConfig {
    /// JSON document with separate `columns` and `data` arrays, located via
    /// a node id embedded in the page markup.
    JsonTable {
        /// Tag of the element carrying the node id (e.g. `"article"`).
        node_tag: String,
        /// Attribute holding the node id.
        node_attribute: String,
        /// Data document path relative to the base URL, with a `{node_id}`
        /// placeholder.
        data_path: String,
    },
    /// HTML `<table>` on the page itself.
    HtmlTable {
        /// CSS selector for the table element.
        table_selector: Option<String>,
        /// CSS selector for header cells.
        header_selector: Option<String>,
        /// CSS selector for body rows.
        row_selector: Option<String>,
        /// CSS selector for cells within a row.
        cell_selector: Option<String>,
        /// Header label of a combined name/location cell to split into two
        /// columns.
        #[serde(default)]
        split_location_column: Option<String>,
    },
    /// `MediaWiki` table in the raw wikitext of an article.
    Wikitext {
        /// Zero-based index among the article's `wikitable`s.
        table_index: Option<usize>,
    },
}

impl ExtractorConfig {
    /// Short name of the extractor kind, as written in TOML.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JsonTable { .. } => "json_table",
            Self::HtmlTable { .. } => "html_table",
            Self::Wikitext { .. } => "wikitext",
        }
    }
}

impl SourceConfig {
    /// Parses a TOML source definition.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] if the TOML is malformed.
    pub fn from_toml(id_hint: &str, toml_str: &str) -> Result<Self, CrawlError> {
        toml::from_str(toml_str).map_err(|e| {
            CrawlError::configuration(id_hint, format!("failed to parse source TOML: {e}"))
        })
    }

    /// Checks the definition for problems that would make every crawl fail.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] if the base URL is not an
    /// absolute http(s) URL, the page URL template does not produce a
    /// valid URL, or no column could ever map to the institution.
    pub fn validate(&self) -> Result<(), CrawlError> {
        self.base()?;

        if let Some(page_url) = self.page_url_for(2000) {
            Url::parse(&page_url).map_err(|e| {
                CrawlError::configuration(
                    &self.id,
                    format!("page URL template '{page_url}' is invalid: {e}"),
                )
            })?;
        }

        let has_institution_route = self
            .fields
            .values()
            .any(|field| *field == CanonicalField::Institution)
            || self.institution_markers.iter().any(|m| !m.trim().is_empty());
        if !has_institution_route {
            return Err(CrawlError::configuration(
                &self.id,
                "no column maps to 'institution' and no institution markers are set",
            ));
        }

        if let ExtractorConfig::JsonTable { data_path, .. } = &self.extractor {
            if !data_path.contains(NODE_ID_PLACEHOLDER) {
                return Err(CrawlError::configuration(
                    &self.id,
                    format!("data_path '{data_path}' lacks a {NODE_ID_PLACEHOLDER} placeholder"),
                ));
            }
        }

        Ok(())
    }

    /// The parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Configuration`] if the base URL does not parse
    /// or is not http(s).
    pub fn base(&self) -> Result<Url, CrawlError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            CrawlError::configuration(&self.id, format!("base URL '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(CrawlError::configuration(
                &self.id,
                format!("base URL '{}' is not an absolute http(s) URL", self.base_url),
            ));
        }
        Ok(url)
    }

    /// The page URL of the given edition, if this source has a template.
    #[must_use]
    pub fn page_url_for(&self, year: u16) -> Option<String> {
        self.page_url
            .as_ref()
            .map(|template| template.replace(YEAR_PLACEHOLDER, &year.to_string()))
    }

    /// An overall-ranking run of this source for `year`.
    #[must_use]
    pub fn run_for(&self, year: u16) -> RankingRun {
        RankingRun::new(self.ranking_system, year)
    }
}
