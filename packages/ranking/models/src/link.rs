//! Institution links.
//!
//! A [`Link`] always holds a cleaned, absolute `http`/`https` URL. The
//! ranking pipeline validates institution URLs through [`Link::new`] so that
//! every URL it emits can be stored as-is.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use url::Url;

/// What a link points at.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkType {
    /// The institution's own website.
    #[default]
    Homepage,
    /// The institution's Wikipedia article.
    Wikipedia,
    /// The institution's profile page on a ranking site.
    RankingPage,
}

/// A URL that failed link validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidLink {
    /// The value was empty after cleaning.
    #[error("link is empty")]
    Empty,
    /// The value is not a parseable absolute URL.
    #[error("'{link}' is not an absolute URL: {reason}")]
    Malformed {
        /// The offending value.
        link: String,
        /// Parser message.
        reason: String,
    },
    /// The URL uses a scheme other than `http`/`https`, or has no host.
    #[error("'{0}' is not an http(s) URL")]
    NotHttp(String),
}

/// A link belonging to an institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Storage primary key, once persisted.
    pub id: Option<i64>,
    /// Owning institution, once known.
    pub institution_id: Option<i64>,
    /// What the link points at.
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Absolute `http`/`https` URL.
    pub link: String,
}

impl Link {
    /// Cleans and validates `raw` as an absolute `http`/`https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLink`] if the cleaned value is empty, unparseable,
    /// or not an `http`/`https` URL with a host.
    pub fn new(link_type: LinkType, raw: &str) -> Result<Self, InvalidLink> {
        let cleaned = raw.trim();
        if cleaned.is_empty() {
            return Err(InvalidLink::Empty);
        }

        let url = Url::parse(cleaned).map_err(|e| InvalidLink::Malformed {
            link: cleaned.to_owned(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(InvalidLink::NotHttp(cleaned.to_owned()));
        }

        Ok(Self {
            id: None,
            institution_id: None,
            link_type,
            link: url.into(),
        })
    }
}

/// A link ready to be created in storage; the owning institution is
/// mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCreate {
    /// Owning institution.
    pub institution_id: i64,
    /// What the link points at.
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Absolute `http`/`https` URL.
    pub link: String,
}

impl LinkCreate {
    /// Attaches a validated [`Link`] to an institution.
    #[must_use]
    pub fn new(institution_id: i64, link: Link) -> Self {
        Self {
            institution_id,
            link_type: link.link_type,
            link: link.link,
        }
    }
}
