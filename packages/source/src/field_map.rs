//! Maps source column labels onto the canonical field vocabulary.
//!
//! Labels are compared after normalization (markup stripped, whitespace
//! collapsed, lowercased), so `"<span>Overall  Score</span>"` and
//! `"overall score"` are the same label. A label with no exact match that
//! contains one of the source's institution markers maps to
//! [`CanonicalField::Institution`]; anything else is dropped.

use std::collections::BTreeMap;

use rankr_ranking_models::CanonicalField;
use rankr_scraper::RawColumn;
use rankr_scraper::markup::strip_markup;

use crate::config::SourceConfig;

/// Per-source label → field lookup.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    fields: BTreeMap<String, CanonicalField>,
    institution_markers: Vec<String>,
}

/// Normalizes a column label for lookup.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    strip_markup(label).to_lowercase()
}

impl FieldMapper {
    /// Builds a mapper from an explicit field table and marker list.
    #[must_use]
    pub fn new(fields: &BTreeMap<String, CanonicalField>, institution_markers: &[String]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(label, field)| (normalize_label(label), *field))
                .collect(),
            institution_markers: institution_markers
                .iter()
                .map(|marker| normalize_label(marker))
                .filter(|marker| !marker.is_empty())
                .collect(),
        }
    }

    /// Builds the mapper for a source definition.
    #[must_use]
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(&config.fields, &config.institution_markers)
    }

    /// Maps one column label to its canonical field, if any.
    #[must_use]
    pub fn map_label(&self, label: &str) -> Option<CanonicalField> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }

        if let Some(field) = self.fields.get(&normalized) {
            return Some(*field);
        }

        self.institution_markers
            .iter()
            .any(|marker| normalized.contains(marker.as_str()))
            .then_some(CanonicalField::Institution)
    }

    /// Maps every column of a table, keeping source order and dropping
    /// unmapped columns. Returns `(column key, field)` pairs.
    #[must_use]
    pub fn map_columns(&self, columns: &[RawColumn]) -> Vec<(String, CanonicalField)> {
        columns
            .iter()
            .filter_map(|column| {
                let field = self.map_label(&column.label);
                if field.is_none() {
                    log::trace!("Dropping unmapped column '{}'", column.label);
                }
                field.map(|f| (column.key.clone(), f))
            })
            .collect()
    }
}
