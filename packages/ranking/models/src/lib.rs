#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ranking run metadata and the canonical ranking record format.
//!
//! Every ranking source (QS, Shanghai ARWU, THE, Wikipedia) produces
//! [`CanonicalRecord`]s whose columns are drawn from the fixed
//! [`CanonicalField`] vocabulary. The [`country`] and [`link`] modules hold
//! the schema types that validate normalized values before they reach
//! storage.

pub mod country;
pub mod link;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use country::{Country, UnknownCountry};
pub use link::{InvalidLink, Link, LinkCreate, LinkType};

/// The organization publishing a ranking table.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum RankingSystem {
    /// QS World University Rankings (topuniversities.com)
    Qs,
    /// Shanghai Academic Ranking of World Universities
    Shanghai,
    /// Times Higher Education World University Rankings
    The,
    /// Ranking tables maintained on Wikipedia
    Wikipedia,
}

impl RankingSystem {
    /// Human-readable name of the ranking publisher.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Qs => "QS",
            Self::Shanghai => "Shanghai",
            Self::The => "THE",
            Self::Wikipedia => "Wikipedia",
        }
    }
}

/// Which kind of table a ranking edition publishes.
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
pub enum RankingType {
    /// Overall institution ranking.
    #[default]
    UniversityRanking,
    /// Ranking restricted to one broad field or subject.
    SubjectRanking,
}

/// Metadata describing one crawl of one ranking edition.
///
/// Built once per crawl and attached unchanged to every record it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRun {
    /// Publisher of the ranking; doubles as the source name.
    pub ranking_system: RankingSystem,
    /// Overall or subject ranking.
    pub ranking_type: RankingType,
    /// Edition year.
    pub year: u16,
    /// Broad field for subject rankings (`"All"` otherwise).
    pub field: String,
    /// Narrow subject for subject rankings (`"All"` otherwise).
    pub subject: String,
}

impl RankingRun {
    /// Creates an overall-ranking run for the given publisher and year.
    #[must_use]
    pub fn new(ranking_system: RankingSystem, year: u16) -> Self {
        Self {
            ranking_system,
            ranking_type: RankingType::UniversityRanking,
            year,
            field: "All".to_owned(),
            subject: "All".to_owned(),
        }
    }

    /// Sets the ranking type.
    #[must_use]
    pub const fn with_ranking_type(mut self, ranking_type: RankingType) -> Self {
        self.ranking_type = ranking_type;
        self
    }

    /// Sets the broad field.
    #[must_use]
    pub fn with_field(mut self, field: &str) -> Self {
        field.clone_into(&mut self.field);
        self
    }

    /// Sets the narrow subject.
    #[must_use]
    pub fn with_subject(mut self, subject: &str) -> Self {
        subject.clone_into(&mut self.subject);
        self
    }

    /// Inserts the run metadata into a flattened row, replacing any values
    /// already stored under the same keys.
    fn merge_into(&self, row: &mut serde_json::Map<String, serde_json::Value>) {
        row.insert(
            "ranking_system".to_owned(),
            self.ranking_system.as_ref().into(),
        );
        row.insert("ranking_type".to_owned(), self.ranking_type.as_ref().into());
        row.insert("year".to_owned(), self.year.into());
        row.insert("field".to_owned(), self.field.clone().into());
        row.insert("subject".to_owned(), self.subject.clone().into());
    }
}

/// The fixed vocabulary of columns a canonical record may carry.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum CanonicalField {
    /// Institution name (and, through its anchor, its URL).
    Institution,
    /// Country or region of the institution.
    Country,
    /// World rank as published (`"1"`, `"=12"`, `"501-510"`).
    Rank,
    /// Rank within the institution's own country.
    NationalRank,
    /// Overall score.
    Score,
    /// Edition year, when a table repeats it per row.
    Year,
    // ── QS indicators ───────────────────────────────────────────────
    AcademicReputation,
    EmployerReputation,
    FacultyStudent,
    CitationsPerFaculty,
    InternationalFaculty,
    InternationalStudents,
    InternationalResearchNetwork,
    EmploymentOutcomes,
    Sustainability,
    // ── THE indicators ──────────────────────────────────────────────
    Teaching,
    Research,
    Citations,
    IndustryIncome,
    InternationalOutlook,
    // ── ARWU indicators ─────────────────────────────────────────────
    Alumni,
    Award,
    Hici,
    NAndS,
    Pub,
    Pcp,
}

/// A ranking table row normalized to the canonical schema.
///
/// `institution` is never empty. Columns the source did not provide, or whose
/// values failed cleaning, are simply absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Institution display name.
    pub institution: String,
    /// Absolute http(s) URL of the institution's page on the ranking site.
    pub url: Option<String>,
    /// Canonicalized country.
    pub country: Option<Country>,
    /// Rank, score, and indicator values keyed by canonical field.
    pub values: BTreeMap<CanonicalField, String>,
    /// Metadata of the crawl that produced this record.
    pub run: RankingRun,
}

impl CanonicalRecord {
    /// Returns the value of a rank/score/indicator column.
    #[must_use]
    pub fn value(&self, field: CanonicalField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Flattens the record into a single key/value object.
    ///
    /// Run metadata is inserted last, so it overrides any mapped column that
    /// happens to share a name with it (e.g. a per-row `year` column).
    #[must_use]
    pub fn to_row(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut row = serde_json::Map::new();

        for (field, value) in &self.values {
            row.insert(field.as_ref().to_owned(), value.clone().into());
        }

        row.insert("institution".to_owned(), self.institution.clone().into());
        if let Some(url) = &self.url {
            row.insert("url".to_owned(), url.clone().into());
        }
        if let Some(country) = &self.country {
            row.insert("country".to_owned(), country.country.clone().into());
            row.insert(
                "country_code".to_owned(),
                country.country_code.clone().into(),
            );
        }

        self.run.merge_into(&mut row);
        row
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_row())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            institution: "A U".to_owned(),
            url: Some("https://src.test/x".to_owned()),
            country: None,
            values: BTreeMap::from([(CanonicalField::Rank, "=3".to_owned())]),
            run: RankingRun::new(RankingSystem::Qs, 2023),
        }
    }

    #[test]
    fn run_metadata_overrides_mapped_columns() {
        let mut rec = record();
        rec.values.insert(CanonicalField::Year, "1999".to_owned());

        let row = rec.to_row();
        assert_eq!(row["year"], serde_json::json!(2023));
        assert_eq!(row["ranking_system"], "qs");
        assert_eq!(row["rank"], "=3");
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let json = serde_json::to_value(record()).unwrap();
        assert!(json.get("country").is_none());
        assert!(json.get("score").is_none());
        assert_eq!(json["institution"], "A U");
        assert_eq!(json["url"], "https://src.test/x");
    }

    #[test]
    fn canonical_field_names_round_trip_through_strum() {
        assert_eq!(CanonicalField::NAndS.as_ref(), "n_and_s");
        assert_eq!(
            CanonicalField::from_str("citations_per_faculty").unwrap(),
            CanonicalField::CitationsPerFaculty
        );
        assert_eq!(CanonicalField::Hici.to_string(), "hici");
    }

    #[test]
    fn run_builders_set_subject_metadata() {
        let run = RankingRun::new(RankingSystem::The, 2022)
            .with_ranking_type(RankingType::SubjectRanking)
            .with_field("Engineering")
            .with_subject("Computer Science");
        assert_eq!(run.ranking_type, RankingType::SubjectRanking);
        assert_eq!(run.field, "Engineering");
        assert_eq!(run.subject, "Computer Science");
    }
}
