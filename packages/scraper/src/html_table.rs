//! HTML table parser.
//!
//! Locates a `<table>` element via CSS selector and turns each body row into
//! a [`RawRow`] keyed by column position (`col_0`, `col_1`, …). Header cells
//! become column labels (text only); body cells keep their inner HTML so
//! that anchors and flag images survive until normalization.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};

use crate::markup::{collapse_whitespace, parse_selector};
use crate::{RawColumn, RawRow, RawTable, ScrapeError};

/// Returns the row key of the column at `index`.
#[must_use]
pub fn column_key(index: usize) -> String {
    format!("col_{index}")
}

/// Parser that extracts an HTML table into a [`RawTable`].
///
/// The default selectors work with standard `<table>` / `<thead>` / `<tbody>`
/// markup. Use the builder methods to customise selectors for non-standard
/// layouts.
#[derive(Debug, Clone)]
pub struct HtmlTableParser {
    /// CSS selector for the target table element.
    table_selector: String,
    /// CSS selector for header cells inside the table.
    header_selector: String,
    /// CSS selector for body rows inside the table.
    row_selector: String,
    /// CSS selector for cells within a body row.
    cell_selector: String,
}

impl Default for HtmlTableParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTableParser {
    /// Creates a parser with the default selectors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_selector: "table".to_owned(),
            header_selector: "thead tr th, thead tr td".to_owned(),
            row_selector: "tbody tr".to_owned(),
            cell_selector: "td".to_owned(),
        }
    }

    /// Overrides the CSS selector used to locate the table element.
    #[must_use]
    pub fn with_table_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.table_selector);
        self
    }

    /// Overrides the CSS selector used to locate header cells.
    #[must_use]
    pub fn with_header_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.header_selector);
        self
    }

    /// Overrides the CSS selector used to locate body rows.
    #[must_use]
    pub fn with_row_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.row_selector);
        self
    }

    /// Overrides the CSS selector used to locate cells within a body row.
    #[must_use]
    pub fn with_cell_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.cell_selector);
        self
    }

    /// Parses `body` and extracts the first table matching the table
    /// selector.
    ///
    /// Body rows without any cell (e.g. repeated header rows) are skipped;
    /// short rows are padded with `""`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Parse`] if a selector is invalid, no table
    /// matches, or the table has no header cells.
    pub fn parse(&self, body: &str) -> Result<RawTable, ScrapeError> {
        let table_sel = parse_selector(&self.table_selector)?;
        let header_sel = parse_selector(&self.header_selector)?;
        let row_sel = parse_selector(&self.row_selector)?;
        let cell_sel = parse_selector(&self.cell_selector)?;

        let document = Html::parse_document(body);

        // ── Locate the table ────────────────────────────────────────────
        let table_element = document.select(&table_sel).next().ok_or_else(|| {
            ScrapeError::Parse(format!(
                "no element matching '{}' found in response",
                self.table_selector
            ))
        })?;

        // ── Extract headers ─────────────────────────────────────────────
        let columns: Vec<RawColumn> = table_element
            .select(&header_sel)
            .enumerate()
            .map(|(i, el)| RawColumn {
                key: column_key(i),
                label: text_of(el),
            })
            .collect();

        if columns.is_empty() {
            return Err(ScrapeError::Parse(
                "no header cells found in table".to_owned(),
            ));
        }

        // ── Extract body rows ───────────────────────────────────────────
        let mut rows = Vec::new();

        for row in table_element.select(&row_sel) {
            let cells: Vec<String> = row
                .select(&cell_sel)
                .map(|el| el.inner_html().trim().to_owned())
                .collect();

            if cells.is_empty() {
                continue;
            }

            let mut map = BTreeMap::new();
            for (i, column) in columns.iter().enumerate() {
                let value = cells.get(i).cloned().unwrap_or_default();
                map.insert(column.key.clone(), value);
            }

            rows.push(RawRow {
                position: rows.len(),
                cells: map,
            });
        }

        log::debug!(
            "Parsed HTML table: {} columns, {} rows",
            columns.len(),
            rows.len()
        );

        Ok(RawTable { columns, rows })
    }
}

/// Whitespace-collapsed text of an element.
fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}
