//! JSON column/data table parser.
//!
//! Some ranking sites ship their tables as a JSON document with the column
//! descriptors separated from the rows:
//!
//! ```json
//! {
//!   "columns": [{"title": "<span>University</span>", "data": "uni"}],
//!   "data": [{"uni": "<a href=\"/x\">A U</a>"}]
//! }
//! ```
//!
//! Column titles are markup and are stripped to form labels. Row values are
//! stringified; `null` and missing values become `""` so that later markup
//! stripping never sees a null.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::markup::strip_markup;
use crate::{RawColumn, RawRow, RawTable, ScrapeError};

/// Parses a JSON column/data document into a [`RawTable`].
///
/// # Errors
///
/// Returns [`ScrapeError::Json`] if the body is not JSON, or
/// [`ScrapeError::Parse`] if the `columns`/`data` arrays are missing or a
/// column has no data key.
pub fn parse_json_table(body: &str) -> Result<RawTable, ScrapeError> {
    let document: Value = serde_json::from_str(body)?;

    let columns = document
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| ScrapeError::Parse("missing 'columns' array".to_owned()))?
        .iter()
        .map(parse_column)
        .collect::<Result<Vec<_>, _>>()?;

    let data = document
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ScrapeError::Parse("missing 'data' array".to_owned()))?;

    let rows = data
        .iter()
        .enumerate()
        .map(|(position, row)| parse_row(position, row, &columns))
        .collect();

    Ok(RawTable { columns, rows })
}

/// Parses one `{"title": …, "data": …}` column descriptor.
fn parse_column(column: &Value) -> Result<RawColumn, ScrapeError> {
    let key = match column.get("data") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(ScrapeError::Parse(format!(
                "column descriptor without a data key: {column}"
            )));
        }
    };
    let title = cell_string(column.get("title"));
    Ok(RawColumn {
        key,
        label: strip_markup(&title),
    })
}

/// Converts one data row into a [`RawRow`], filling missing column keys
/// with `""`.
fn parse_row(position: usize, row: &Value, columns: &[RawColumn]) -> RawRow {
    let mut cells: BTreeMap<String, String> = BTreeMap::new();

    if let Some(object) = row.as_object() {
        for (key, value) in object {
            cells.insert(key.clone(), cell_string(Some(value)));
        }
    } else {
        log::warn!("Row {position} is not a JSON object, treating it as empty");
    }

    for column in columns {
        cells.entry(column.key.clone()).or_default();
    }

    RawRow { position, cells }
}

/// Stringifies a JSON cell; `null` and missing become `""`.
fn cell_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
