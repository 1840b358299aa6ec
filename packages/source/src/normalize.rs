//! Value cleaning for raw cells.
//!
//! Every function takes the raw cell string (which may contain markup) and
//! returns either a cleaned value, `None` when the cell is empty, or a
//! [`RowNormalizationError`] the row processor recovers from.

use rankr_ranking_models::{Country, InvalidLink, Link, LinkType};
use rankr_scraper::markup::{first_anchor, first_image_label, strip_markup};
use url::Url;

use crate::RowNormalizationError;

/// Strips markup and collapses whitespace. Empty results are `None`.
#[must_use]
pub fn normalize_text(raw: &str) -> Option<String> {
    let text = strip_markup(raw);
    if text.is_empty() { None } else { Some(text) }
}

/// Resolves a country cell.
///
/// The cell text is used when present; otherwise the label of the first
/// image (a flag) is tried. An empty cell yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`RowNormalizationError::UnknownCountry`] if the name is not in
/// the country table.
pub fn normalize_country(raw: &str) -> Result<Option<Country>, RowNormalizationError> {
    let Some(name) = normalize_text(raw).or_else(|| first_image_label(raw)) else {
        return Ok(None);
    };
    Ok(Some(Country::from_name(&name)?))
}

/// Extracts the institution name from a cell: the text of its first
/// anchor, or the whole cell text when there is no anchor or the anchor is
/// empty.
///
/// # Errors
///
/// Returns [`RowNormalizationError::MissingInstitution`] if no text remains.
pub fn institution_name(raw: &str, position: usize) -> Result<String, RowNormalizationError> {
    first_anchor(raw)
        .map(|anchor| anchor.text)
        .filter(|text| !text.is_empty())
        .or_else(|| normalize_text(raw))
        .ok_or(RowNormalizationError::MissingInstitution { position })
}

/// Extracts the institution URL from a cell's first anchor, resolved
/// against `base`. A cell without an anchor or href yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`RowNormalizationError::InvalidUrl`] if the href cannot be
/// resolved into an absolute http(s) URL.
pub fn institution_url(raw: &str, base: &Url) -> Result<Option<String>, RowNormalizationError> {
    let Some(href) = first_anchor(raw).and_then(|anchor| anchor.href) else {
        return Ok(None);
    };
    if href.trim().is_empty() {
        return Ok(None);
    }
    resolve_url(base, &href).map(Some)
}

/// Joins `href` onto `base` and validates the result as a ranking page link.
///
/// # Errors
///
/// Returns [`RowNormalizationError::InvalidUrl`] if the join fails or the
/// result is not an absolute http(s) URL.
pub fn resolve_url(base: &Url, href: &str) -> Result<String, RowNormalizationError> {
    let joined = base
        .join(href.trim())
        .map_err(|e| RowNormalizationError::InvalidUrl {
            href: href.to_owned(),
            source: InvalidLink::Malformed {
                link: href.to_owned(),
                reason: e.to_string(),
            },
        })?;

    Link::new(LinkType::RankingPage, joined.as_str())
        .map(|link| link.link)
        .map_err(|source| RowNormalizationError::InvalidUrl {
            href: href.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.topuniversities.com").unwrap()
    }

    #[test]
    fn text_is_stripped_and_empty_is_absent() {
        assert_eq!(
            normalize_text("<div> 95.2 </div>").as_deref(),
            Some("95.2")
        );
        assert_eq!(normalize_text(""), None);
        assert_eq!(normalize_text("<span> </span>"), None);
    }

    #[test]
    fn country_from_text_or_flag() {
        let text = normalize_country("<div>United States</div>").unwrap().unwrap();
        assert_eq!(text.country_code, "US");

        let flag = normalize_country(r#"<img src="/f/cn.png" title="China">"#)
            .unwrap()
            .unwrap();
        assert_eq!(flag.country, "China");

        assert!(normalize_country("").unwrap().is_none());
    }

    #[test]
    fn unknown_country_is_an_error() {
        assert!(matches!(
            normalize_country("Testland"),
            Err(RowNormalizationError::UnknownCountry(_))
        ));
    }

    #[test]
    fn institution_name_prefers_anchor_text() {
        assert_eq!(
            institution_name("<a href='/x'>A U</a> <span>(2)</span>", 0).unwrap(),
            "A U"
        );
        assert_eq!(institution_name("Plain U", 0).unwrap(), "Plain U");
        assert_eq!(institution_name("<a href='/x'></a>Fallback", 0).unwrap(), "Fallback");
        assert!(matches!(
            institution_name("<a href='/x'> </a>", 4),
            Err(RowNormalizationError::MissingInstitution { position: 4 })
        ));
    }

    #[test]
    fn relative_urls_resolve_under_base() {
        assert_eq!(
            institution_url("<a href='/x'>A U</a>", &base()).unwrap().as_deref(),
            Some("https://www.topuniversities.com/x")
        );
        assert_eq!(institution_url("A U", &base()).unwrap(), None);
    }

    #[test]
    fn absolute_and_non_http_urls() {
        assert_eq!(
            institution_url("<a href='https://other.test/u'>U</a>", &base())
                .unwrap()
                .as_deref(),
            Some("https://other.test/u")
        );
        assert!(matches!(
            institution_url("<a href='mailto:a@b.test'>U</a>", &base()),
            Err(RowNormalizationError::InvalidUrl { .. })
        ));
    }
}
