//! Markup helpers built on the `scraper` HTML parser.
//!
//! Ranking tables embed HTML fragments in their cells and column titles.
//! These helpers strip such fragments to text, pull out the first anchor or
//! flag image, and locate marker attributes in full documents.
//!
//! All functions return owned data; parsed trees never outlive the call.

use scraper::{ElementRef, Html, Selector};

use crate::ScrapeError;

/// An `<a>` element recovered from a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Visible text, whitespace-collapsed.
    pub text: String,
    /// The `href` attribute as written (may be relative).
    pub href: Option<String>,
}

/// Collapses runs of whitespace into single spaces and trims the ends.
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the visible text of a markup fragment, whitespace-collapsed.
///
/// Plain text passes through unchanged (apart from entity decoding and
/// whitespace collapsing).
#[must_use]
pub fn strip_markup(fragment: &str) -> String {
    if fragment.is_empty() {
        return String::new();
    }
    let html = Html::parse_fragment(fragment);
    collapse_whitespace(&element_text(html.root_element()))
}

/// Returns the first `<a>` in a fragment, if any.
#[must_use]
pub fn first_anchor(fragment: &str) -> Option<Anchor> {
    let html = Html::parse_fragment(fragment);
    let selector = static_selector("a")?;
    html.select(&selector).next().map(|a| Anchor {
        text: collapse_whitespace(&element_text(a)),
        href: a.value().attr("href").map(str::to_owned),
    })
}

/// Returns the first `<a>` in a fragment that is not inside an element
/// matching `excluded`.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if `excluded` is not a valid selector.
pub fn first_anchor_outside(
    fragment: &str,
    excluded: &str,
) -> Result<Option<Anchor>, ScrapeError> {
    let excluded = parse_selector(excluded)?;
    let html = Html::parse_fragment(fragment);
    let Some(selector) = static_selector("a") else {
        return Ok(None);
    };
    Ok(html
        .select(&selector)
        .find(|a| {
            !a.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| excluded.matches(&el))
        })
        .map(|a| Anchor {
            text: collapse_whitespace(&element_text(a)),
            href: a.value().attr("href").map(str::to_owned),
        }))
}

/// Returns the text of the first element matching `selector` in a
/// fragment, whitespace-collapsed.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if `selector` is invalid.
pub fn select_text(fragment: &str, selector: &str) -> Result<Option<String>, ScrapeError> {
    let selector = parse_selector(selector)?;
    let html = Html::parse_fragment(fragment);
    Ok(html
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&element_text(el))))
}

/// Returns the `title` (or, failing that, `alt`) of the first `<img>` in a
/// fragment. Used for cells that show a flag instead of a country name.
#[must_use]
pub fn first_image_label(fragment: &str) -> Option<String> {
    let html = Html::parse_fragment(fragment);
    let selector = static_selector("img")?;
    let img = html.select(&selector).next()?;
    ["title", "alt"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(collapse_whitespace)
        .find(|label| !label.is_empty())
}

/// Finds the first `<tag>` in a document carrying `attr` and returns that
/// attribute's value.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if `tag`/`attr` do not form a valid CSS
/// selector.
pub fn find_attribute(
    document: &str,
    tag: &str,
    attr: &str,
) -> Result<Option<String>, ScrapeError> {
    let selector = parse_selector(&format!("{tag}[{attr}]"))?;
    let html = Html::parse_document(document);
    Ok(html
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_owned()))
}

/// Escapes text for embedding in synthesized markup.
#[must_use]
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Builds an anchor fragment from a display name and an optional href.
#[must_use]
pub fn anchor_markup(text: &str, href: Option<&str>) -> String {
    match href {
        Some(href) if !href.trim().is_empty() => format!(
            "<a href=\"{}\">{}</a>",
            escape_text(href.trim()),
            escape_text(text)
        ),
        _ => escape_text(text),
    }
}

/// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the selector is invalid.
pub fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

/// Parses a selector that is known to be valid.
fn static_selector(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

/// Concatenates all text nodes under an element.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let cell = "<div class=\"td-wrap\">\n  <a href=\"/x\">Massachusetts   Institute</a> </div>";
        assert_eq!(strip_markup(cell), "Massachusetts Institute");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(strip_markup("Texas A&amp;M"), "Texas A&M");
    }

    #[test]
    fn plain_and_empty_text_pass_through() {
        assert_eq!(strip_markup("Testland"), "Testland");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn finds_first_anchor() {
        let anchor = first_anchor("<a href='/x'>A U</a><a href='/y'>B</a>").unwrap();
        assert_eq!(anchor.text, "A U");
        assert_eq!(anchor.href.as_deref(), Some("/x"));
        assert!(first_anchor("no links here").is_none());
    }

    #[test]
    fn skips_anchors_inside_excluded_elements() {
        let cell = r#"<div class="location"><a href="/loc/uk">United Kingdom</a></div>
            <a href="/u/oxford">University of Oxford</a>"#;
        let anchor = first_anchor_outside(cell, ".location").unwrap().unwrap();
        assert_eq!(anchor.text, "University of Oxford");
        assert_eq!(
            select_text(cell, ".location").unwrap().as_deref(),
            Some("United Kingdom")
        );
        assert_eq!(select_text(cell, ".missing").unwrap(), None);
    }

    #[test]
    fn reads_flag_image_title() {
        let cell = r#"<img src="/flags/us.png" title="United States" alt="US">"#;
        assert_eq!(first_image_label(cell).as_deref(), Some("United States"));
        assert_eq!(
            first_image_label(r#"<img src="/f.png" alt="Japan">"#).as_deref(),
            Some("Japan")
        );
    }

    #[test]
    fn finds_marker_attribute_in_document() {
        let doc = r#"<html><body>
            <article class="teaser">no id</article>
            <article data-history-node-id="3816281" class="node">x</article>
        </body></html>"#;
        assert_eq!(
            find_attribute(doc, "article", "data-history-node-id").unwrap(),
            Some("3816281".to_owned())
        );
        assert_eq!(
            find_attribute("<html></html>", "article", "data-history-node-id").unwrap(),
            None
        );
    }

    #[test]
    fn builds_escaped_anchor_markup() {
        assert_eq!(
            anchor_markup("Texas A&M", Some("/u/tamu")),
            "<a href=\"/u/tamu\">Texas A&amp;M</a>"
        );
        assert_eq!(anchor_markup("Plain", None), "Plain");
        assert_eq!(strip_markup(&anchor_markup("Texas A&M", Some("/u"))), "Texas A&M");
    }
}
