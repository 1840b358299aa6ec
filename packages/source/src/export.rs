//! Writes crawl results to disk as JSON or CSV.
//!
//! Records are flattened with [`CanonicalRecord::to_row`], so both formats
//! carry the run metadata on every row.

use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use rankr_ranking_models::{CanonicalRecord, RankingType};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::crawler::CrawlOutput;

/// Errors that can occur while exporting records.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error (directory creation, file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array of flattened records.
    #[default]
    Json,
    /// CSV with one column per key seen in any record.
    Csv,
}

impl ExportFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// File name stem for a crawl: `{source_id}_{year}`, with the subject
/// appended for subject rankings.
#[must_use]
pub fn file_stem(output: &CrawlOutput) -> String {
    let run = &output.run;
    match run.ranking_type {
        RankingType::UniversityRanking => format!("{}_{}", output.source_id, run.year),
        RankingType::SubjectRanking => format!(
            "{}_{}_{}",
            output.source_id,
            run.year,
            slug(&run.subject)
        ),
    }
}

/// Lowercases and replaces anything but ASCII alphanumerics with `_`.
fn slug(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes `records` to `dir/stem.<ext>`, creating `dir` if needed.
///
/// # Errors
///
/// Returns [`ExportError`] if the directory or file cannot be written.
pub fn write_records(
    records: &[CanonicalRecord],
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{stem}.{}", format.extension()));
    let mut writer = BufWriter::new(File::create(&path)?);

    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n")?;
        }
        ExportFormat::Csv => write_csv(records, &mut writer)?,
    }

    writer.flush()?;
    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

fn write_csv(records: &[CanonicalRecord], writer: impl std::io::Write) -> Result<(), ExportError> {
    let rows: Vec<_> = records.iter().map(CanonicalRecord::to_row).collect();

    let mut header: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&header)?;
    for row in &rows {
        csv.write_record(header.iter().map(|key| match row.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }))?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rankr_ranking_models::{CanonicalField, Country, RankingRun, RankingSystem};

    use super::*;

    fn records() -> Vec<CanonicalRecord> {
        let run = RankingRun::new(RankingSystem::Shanghai, 2023);
        vec![
            CanonicalRecord {
                institution: "Harvard University".to_owned(),
                url: Some("https://www.shanghairanking.com/institution/harvard".to_owned()),
                country: Country::from_name("United States").ok(),
                values: BTreeMap::from([(CanonicalField::Rank, "1".to_owned())]),
                run: run.clone(),
            },
            CanonicalRecord {
                institution: "Texas A&M, College Station".to_owned(),
                url: None,
                country: None,
                values: BTreeMap::from([(CanonicalField::Score, "31.2".to_owned())]),
                run,
            },
        ]
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rankr_export_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_json_array() {
        let dir = temp_dir("json");
        let path = write_records(&records(), &dir, "shanghai_2023", ExportFormat::Json).unwrap();
        assert_eq!(path, dir.join("shanghai_2023.json"));

        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["country_code"], "US");
        assert_eq!(written[1]["year"], 2023);
        assert!(written[1].get("url").is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn writes_csv_with_union_header() {
        let dir = temp_dir("csv");
        let path = write_records(&records(), &dir, "shanghai_2023", ExportFormat::Csv).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_owned).collect();
        assert!(header.contains(&"rank".to_owned()));
        assert!(header.contains(&"score".to_owned()));

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        let institution = header.iter().position(|h| h == "institution").unwrap();
        assert_eq!(&rows[1][institution], "Texas A&M, College Station");
        let rank = header.iter().position(|h| h == "rank").unwrap();
        assert_eq!(&rows[1][rank], "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::Json.to_string(), "json");
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
