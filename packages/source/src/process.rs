//! Turns a [`RawTable`] into canonical records.
//!
//! Row-level problems never abort processing: an unresolvable country or
//! URL drops that one field, and a row without an institution name is
//! skipped. Every such recovery is counted in [`RowStats`].

use std::collections::BTreeMap;

use rankr_ranking_models::{CanonicalField, CanonicalRecord, Country, RankingRun};
use rankr_scraper::{RawRow, RawTable};
use url::Url;

use crate::RowNormalizationError;
use crate::field_map::FieldMapper;
use crate::normalize::{institution_name, institution_url, normalize_country, normalize_text};
use crate::progress::ProgressCallback;

/// Counters describing how rows fared during processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    /// Rows in the raw table.
    pub rows_in: u64,
    /// Records emitted.
    pub records_out: u64,
    /// Rows dropped for lacking an institution name.
    pub rows_skipped: u64,
    /// Records emitted without a country because it could not be resolved.
    pub countries_omitted: u64,
    /// Records emitted without a URL because it could not be resolved.
    pub urls_omitted: u64,
}

/// Output of [`process_rows`].
#[derive(Debug, Clone, Default)]
pub struct ProcessedRows {
    /// Records in source row order.
    pub records: Vec<CanonicalRecord>,
    /// Row counters.
    pub stats: RowStats,
}

/// Normalizes every row of `table` into a [`CanonicalRecord`] carrying
/// `run`.
///
/// When several columns map to the same field, the first non-empty one in
/// column order wins.
#[must_use]
pub fn process_rows(
    table: &RawTable,
    mapper: &FieldMapper,
    base: &Url,
    run: &RankingRun,
    progress: &dyn ProgressCallback,
) -> ProcessedRows {
    let columns = mapper.map_columns(&table.columns);
    let mut out = ProcessedRows::default();
    out.stats.rows_in = table.len() as u64;

    progress.set_total(out.stats.rows_in);

    for row in &table.rows {
        match process_row(row, &columns, base, run, &mut out.stats) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                log::debug!("Skipping row {}: {e}", row.position);
                out.stats.rows_skipped += 1;
            }
        }
        progress.inc(1);
    }

    out.stats.records_out = out.records.len() as u64;
    out
}

/// Normalizes one row. Only a missing institution is returned as an error;
/// other failures are recorded in `stats` and the field is omitted.
fn process_row(
    row: &RawRow,
    columns: &[(String, CanonicalField)],
    base: &Url,
    run: &RankingRun,
    stats: &mut RowStats,
) -> Result<CanonicalRecord, RowNormalizationError> {
    let mut cells: BTreeMap<CanonicalField, Vec<&str>> = BTreeMap::new();
    for (key, field) in columns {
        cells.entry(*field).or_default().push(row.get(key));
    }

    let candidates = |field: CanonicalField| cells.get(&field).into_iter().flatten().copied();

    // ── Institution ─────────────────────────────────────────────────────
    let (institution, institution_cell) = candidates(CanonicalField::Institution)
        .find_map(|raw| {
            institution_name(raw, row.position)
                .ok()
                .map(|name| (name, raw))
        })
        .ok_or(RowNormalizationError::MissingInstitution {
            position: row.position,
        })?;

    let url = match institution_url(institution_cell, base) {
        Ok(url) => url,
        Err(e) => {
            log::debug!("Row {}: omitting URL: {e}", row.position);
            stats.urls_omitted += 1;
            None
        }
    };

    // ── Country ─────────────────────────────────────────────────────────
    let country = first_country(candidates(CanonicalField::Country)).unwrap_or_else(|e| {
        log::debug!("Row {}: omitting country: {e}", row.position);
        stats.countries_omitted += 1;
        None
    });

    // ── Remaining fields ────────────────────────────────────────────────
    let mut values = BTreeMap::new();
    for field in cells.keys() {
        if matches!(field, CanonicalField::Institution | CanonicalField::Country) {
            continue;
        }
        if let Some(value) = candidates(*field).find_map(normalize_text) {
            values.insert(*field, value);
        }
    }

    Ok(CanonicalRecord {
        institution,
        url,
        country,
        values,
        run: run.clone(),
    })
}

/// Resolves the first non-empty country cell.
fn first_country<'a>(
    mut cells: impl Iterator<Item = &'a str>,
) -> Result<Option<Country>, RowNormalizationError> {
    cells
        .find_map(|raw| normalize_country(raw).transpose())
        .transpose()
}

#[cfg(test)]
mod tests {
    use rankr_ranking_models::RankingSystem;
    use rankr_scraper::json_table::parse_json_table;

    use super::*;
    use crate::progress::NullProgress;

    fn mapper() -> FieldMapper {
        let fields = BTreeMap::from([
            ("rank".to_owned(), CanonicalField::Rank),
            ("country".to_owned(), CanonicalField::Country),
            ("overall score".to_owned(), CanonicalField::Score),
            ("year".to_owned(), CanonicalField::Year),
        ]);
        FieldMapper::new(&fields, &["university".to_owned()])
    }

    fn base() -> Url {
        Url::parse("https://www.topuniversities.com").unwrap()
    }

    fn run() -> RankingRun {
        RankingRun::new(RankingSystem::Qs, 2023)
    }

    fn process(body: &serde_json::Value) -> ProcessedRows {
        let table = parse_json_table(&body.to_string()).unwrap();
        process_rows(&table, &mapper(), &base(), &run(), &NullProgress)
    }

    #[test]
    fn unknown_country_is_omitted_and_row_kept() {
        let out = process(&serde_json::json!({
            "columns": [
                {"title": "University", "data": "uni"},
                {"title": "Country", "data": "cty"},
            ],
            "data": [{"uni": "<a href='/x'>A U</a>", "cty": "Testland"}],
        }));

        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.institution, "A U");
        assert_eq!(
            record.url.as_deref(),
            Some("https://www.topuniversities.com/x")
        );
        assert!(record.country.is_none());
        assert_eq!(record.run, run());
        assert_eq!(out.stats.countries_omitted, 1);

        let row = record.to_row();
        assert_eq!(row["ranking_system"], "qs");
        assert_eq!(row["year"], 2023);
        assert!(!row.contains_key("country"));
    }

    #[test]
    fn null_country_is_absent_without_error() {
        let out = process(&serde_json::json!({
            "columns": [
                {"title": "University", "data": "uni"},
                {"title": "Country", "data": "cty"},
            ],
            "data": [{"uni": "<a href='/x'>A U</a>", "cty": null}],
        }));

        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].country.is_none());
        assert_eq!(out.stats.countries_omitted, 0);
    }

    #[test]
    fn rows_without_institution_are_dropped() {
        let out = process(&serde_json::json!({
            "columns": [
                {"title": "Rank", "data": "r"},
                {"title": "University", "data": "uni"},
            ],
            "data": [
                {"r": "1", "uni": "A U"},
                {"r": "2", "uni": ""},
                {"r": "3", "uni": "<a href='/c'>C U</a>"},
            ],
        }));

        assert_eq!(out.stats.rows_in, 3);
        assert_eq!(out.stats.records_out, 2);
        assert_eq!(out.stats.rows_skipped, 1);
        let names: Vec<&str> = out.records.iter().map(|r| r.institution.as_str()).collect();
        assert_eq!(names, vec!["A U", "C U"]);
        assert_eq!(out.records[1].value(CanonicalField::Rank), Some("3"));
    }

    #[test]
    fn records_never_exceed_rows() {
        let out = process(&serde_json::json!({
            "columns": [{"title": "University", "data": "uni"}],
            "data": [{"uni": "A"}, {"uni": "B"}, {}],
        }));
        assert!(out.stats.records_out <= out.stats.rows_in);
        assert_eq!(
            out.stats.records_out + out.stats.rows_skipped,
            out.stats.rows_in
        );
    }

    #[test]
    fn first_non_empty_duplicate_column_wins() {
        let fields = BTreeMap::from([
            ("rank".to_owned(), CanonicalField::Rank),
            ("rank display".to_owned(), CanonicalField::Rank),
        ]);
        let mapper = FieldMapper::new(&fields, &["university".to_owned()]);
        let table = parse_json_table(
            &serde_json::json!({
                "columns": [
                    {"title": "Rank", "data": "a"},
                    {"title": "Rank Display", "data": "b"},
                    {"title": "University", "data": "u"},
                ],
                "data": [{"a": "", "b": "=5", "u": "X"}, {"a": "7", "b": "8", "u": "Y"}],
            })
            .to_string(),
        )
        .unwrap();

        let out = process_rows(&table, &mapper, &base(), &run(), &NullProgress);
        assert_eq!(out.records[0].value(CanonicalField::Rank), Some("=5"));
        assert_eq!(out.records[1].value(CanonicalField::Rank), Some("7"));
    }

    #[test]
    fn run_metadata_wins_over_mapped_year() {
        let out = process(&serde_json::json!({
            "columns": [
                {"title": "University", "data": "u"},
                {"title": "Year", "data": "y"},
            ],
            "data": [{"u": "A", "y": "1999"}],
        }));
        assert_eq!(out.records[0].value(CanonicalField::Year), Some("1999"));
        assert_eq!(out.records[0].to_row()["year"], 2023);
    }

    #[test]
    fn invalid_url_is_omitted_and_counted() {
        let out = process(&serde_json::json!({
            "columns": [{"title": "University", "data": "u"}],
            "data": [{"u": "<a href='javascript:void(0)'>A U</a>"}],
        }));
        assert_eq!(out.records[0].institution, "A U");
        assert!(out.records[0].url.is_none());
        assert_eq!(out.stats.urls_omitted, 1);
    }
}
