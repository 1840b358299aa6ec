//! MediaWiki table parser.
//!
//! Parses `{| class="wikitable" … |}` tables from raw wikitext into a
//! [`RawTable`]. Cell content is rendered into plain HTML-ish markup so the
//! same normalization applies as for HTML sources:
//!
//! * `[[Target|Text]]` becomes `<a href="/wiki/Target">Text</a>`
//! * `[https://x Text]` becomes `<a href="https://x">Text</a>`
//! * flag templates (`{{flag|France}}`, `{{flagcountry|France}}`,
//!   `{{flagicon|France}}`) become the country name
//! * `{{sort|key|text}}` becomes `text`; unknown templates disappear
//! * references, comments, and bold/italic quotes are removed
//!
//! `rowspan`/`colspan` are not expanded; cells are assigned to columns by
//! position.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::html_table::column_key;
use crate::markup::{anchor_markup, collapse_whitespace, strip_markup};
use crate::{RawColumn, RawRow, RawTable, ScrapeError};

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<ref[^>]*/>|<ref[^>]*>.*?</ref>").expect("valid regex")
});

/// Innermost template: no nested braces inside.
static TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid regex"));

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]*))?\]\]").expect("valid regex")
});

static EXTERNAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(https?://[^\s\]]+)(?:\s+([^\]]*))?\]").expect("valid regex")
});

static QUOTES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'{2,}").expect("valid regex"));

static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

/// Upper bound on nested template passes.
const MAX_TEMPLATE_DEPTH: usize = 8;

/// Parses the `index`-th (zero-based) top-level `wikitable` in `text`.
///
/// The first row made only of header (`!`) cells supplies the column
/// labels; later all-header rows are treated as sub-headings and skipped.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if there is no such table or it has no
/// header row.
pub fn parse_wikitext_table(text: &str, index: usize) -> Result<RawTable, ScrapeError> {
    let tables = wikitables(text);
    let lines = tables.get(index).ok_or_else(|| {
        ScrapeError::Parse(format!(
            "wikitable #{index} not found ({} present)",
            tables.len()
        ))
    })?;

    let mut columns: Option<Vec<RawColumn>> = None;
    let mut rows = Vec::new();

    for cells in split_rows(lines) {
        let all_headers = cells.iter().all(|c| c.header);

        if columns.is_none() {
            if all_headers {
                columns = Some(
                    cells
                        .iter()
                        .enumerate()
                        .map(|(i, cell)| RawColumn {
                            key: column_key(i),
                            label: strip_markup(&render_cell(&cell.content)),
                        })
                        .collect(),
                );
            }
            continue;
        }

        let Some(columns) = columns.as_ref() else {
            continue;
        };

        if all_headers {
            continue;
        }

        let mut map = BTreeMap::new();
        for (i, column) in columns.iter().enumerate() {
            let value = cells
                .get(i)
                .map(|cell| render_cell(&cell.content))
                .unwrap_or_default();
            map.insert(column.key.clone(), value);
        }
        rows.push(RawRow {
            position: rows.len(),
            cells: map,
        });
    }

    let columns =
        columns.ok_or_else(|| ScrapeError::Parse("wikitable has no header row".to_owned()))?;

    log::debug!(
        "Parsed wikitable #{index}: {} columns, {} rows",
        columns.len(),
        rows.len()
    );

    Ok(RawTable { columns, rows })
}

/// Renders wikitext cell content into markup understood by
/// [`crate::markup`].
#[must_use]
pub fn render_cell(content: &str) -> String {
    let mut out = COMMENT_RE.replace_all(content, "").into_owned();
    out = REF_RE.replace_all(&out, "").into_owned();

    for _ in 0..MAX_TEMPLATE_DEPTH {
        if !TEMPLATE_RE.is_match(&out) {
            break;
        }
        out = TEMPLATE_RE
            .replace_all(&out, |caps: &Captures<'_>| render_template(&caps[1]))
            .into_owned();
    }

    out = LINK_RE.replace_all(&out, render_link).into_owned();
    out = EXTERNAL_LINK_RE
        .replace_all(&out, |caps: &Captures<'_>| {
            let href = &caps[1];
            let text = caps.get(2).map_or(href, |m| m.as_str());
            anchor_markup(text, Some(href))
        })
        .into_owned();
    out = QUOTES_RE.replace_all(&out, "").into_owned();
    out = BR_RE.replace_all(&out, " ").into_owned();

    out.trim().to_owned()
}

/// A table cell before rendering.
#[derive(Debug)]
struct Cell {
    header: bool,
    content: String,
}

/// Collects the body lines of every top-level `wikitable`.
fn wikitables(text: &str) -> Vec<Vec<&str>> {
    let mut tables = Vec::new();
    let mut current: Option<(bool, Vec<&str>)> = None;
    let mut depth = 0usize;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("{|") {
            depth += 1;
            if depth == 1 {
                current = Some((trimmed.contains("wikitable"), Vec::new()));
                continue;
            }
        } else if trimmed.starts_with("|}") && depth > 0 {
            depth -= 1;
            if depth == 0 {
                if let Some((true, lines)) = current.take() {
                    tables.push(lines);
                }
                continue;
            }
        }

        if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    tables
}

/// Groups table body lines into rows of cells.
fn split_rows(lines: &[&str]) -> Vec<Vec<Cell>> {
    let mut rows = Vec::new();
    let mut current: Vec<Cell> = Vec::new();

    for line in lines {
        let trimmed = line.trim();

        if trimmed.starts_with("|+") {
            continue;
        }
        if trimmed.starts_with("|-") {
            if !current.is_empty() {
                rows.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('!') {
            for part in split_top_level(rest, "!!") {
                for cell in split_top_level(part, "||") {
                    current.push(Cell {
                        header: true,
                        content: strip_attributes(cell).to_owned(),
                    });
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix('|') {
            for cell in split_top_level(rest, "||") {
                current.push(Cell {
                    header: false,
                    content: strip_attributes(cell).to_owned(),
                });
            }
        } else if !trimmed.is_empty() {
            if let Some(last) = current.last_mut() {
                last.content.push(' ');
                last.content.push_str(trimmed);
            }
        }
    }

    if !current.is_empty() {
        rows.push(current);
    }

    rows
}

/// Drops a leading `attr="…" |` prefix from a cell.
fn strip_attributes(cell: &str) -> &str {
    let parts = split_top_level(cell, "|");
    if parts.len() >= 2 && parts[0].contains('=') {
        let offset = parts[0].len() + 1;
        return cell[offset..].trim();
    }
    cell.trim()
}

/// Splits `s` on `sep` wherever it occurs outside `[[…]]` and `{{…}}`.
fn split_top_level<'a>(s: &'a str, sep: &str) -> Vec<&'a str> {
    let bytes = s.as_bytes();
    let sep = sep.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"[[") || rest.starts_with(b"{{") {
            depth += 1;
            i += 2;
        } else if (rest.starts_with(b"]]") || rest.starts_with(b"}}")) && depth > 0 {
            depth -= 1;
            i += 2;
        } else if depth == 0 && rest.starts_with(sep) {
            parts.push(&s[start..i]);
            i += sep.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Renders the inside of one innermost `{{…}}` template.
fn render_template(inner: &str) -> String {
    let parts = split_top_level(inner, "|");
    let name = parts[0].trim().to_lowercase();
    let positional: Vec<&str> = parts[1..]
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.contains('=') || p.starts_with("[["))
        .collect();

    match name.as_str() {
        "flag" | "flagcountry" | "flagicon" | "flagu" | "flag country" | "nowrap" | "nobr"
        | "small" => {
            positional.first().copied().unwrap_or_default().to_owned()
        }
        "sort" => positional
            .get(1)
            .or_else(|| positional.first())
            .copied()
            .unwrap_or_default()
            .to_owned(),
        "sortname" => {
            let parts: Vec<&str> = positional.iter().take(2).copied().collect();
            let full = collapse_whitespace(&parts.join(" "));
            if full.is_empty() {
                full
            } else {
                format!("[[{full}]]")
            }
        }
        "ubl" | "unbulleted list" | "hlist" | "plainlist" => positional.join(" "),
        _ => String::new(),
    }
}

/// Renders one `[[Target|Text]]` match.
fn render_link(caps: &Captures<'_>) -> String {
    let target = caps[1].trim();
    let lower = target.to_lowercase();
    if ["file:", "image:", "category:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return String::new();
    }

    let target = target.trim_start_matches(':');
    let text = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(target);
    let page = target.split('#').next().unwrap_or(target).replace(' ', "_");

    anchor_markup(text, Some(&format!("/wiki/{page}")))
}
