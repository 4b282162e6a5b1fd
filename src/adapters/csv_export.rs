//! Health export CSV adapter
//!
//! Reads the per-type CSV files of a health export. Each row carries at least
//! `startDate`, `value` and `sourceName`; any other column is ignored.

use crate::config::DateWindow;
use crate::error::ComputeError;
use crate::types::Sample;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SampleSource;

const START_DATE_COLUMN: &str = "startDate";
const VALUE_COLUMN: &str = "value";

/// Directory of exported CSV files
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl SampleSource for CsvDirectorySource {
    fn load(&self, file: &str, window: &DateWindow) -> Result<Vec<Sample>, ComputeError> {
        let path = self.path_of(file);
        if !path.exists() {
            warn!(path = %path.display(), "export file not found");
            return Ok(Vec::new());
        }

        let reader = File::open(&path)?;
        let samples = parse_samples(reader, window)?;
        debug!(path = %path.display(), samples = samples.len(), "loaded export file");
        Ok(samples)
    }

    fn exists(&self, file: &str) -> bool {
        self.path_of(file).is_file()
    }
}

/// One row of an export file
#[derive(Debug, Deserialize)]
struct ExportRow {
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(default)]
    value: String,
    #[serde(rename = "sourceName", default)]
    source_name: String,
}

/// Parse export CSV from any reader, keeping rows whose day lies in `window`.
///
/// Rows with an unparseable `startDate` are skipped, as are rows the reader
/// cannot decode at all (truncated rows, invalid UTF-8). Rows with an
/// unparseable `value` are kept with `value: None` so the aggregator can
/// ignore them. Only header and I/O failures are errors.
pub fn parse_samples<R: Read>(reader: R, window: &DateWindow) -> Result<Vec<Sample>, ComputeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for column in [START_DATE_COLUMN, VALUE_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(ComputeError::MissingColumn(column.to_string()));
        }
    }

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for row in csv_reader.deserialize::<ExportRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => {
                debug!(error = %e, "skipping unreadable row");
                skipped += 1;
                continue;
            }
        };

        let Some(timestamp) = parse_timestamp(&row.start_date) else {
            skipped += 1;
            continue;
        };

        if !window.contains(timestamp.date()) {
            continue;
        }

        samples.push(Sample {
            timestamp,
            value: parse_value(&row.value),
            source: row.source_name,
        });
    }

    if skipped > 0 {
        debug!(skipped, "skipped unreadable rows");
    }

    Ok(samples)
}

/// Parse an export timestamp such as `2024-01-15 07:42:10 +0900`.
///
/// The trailing UTC offset is discarded: bucketing happens on the local
/// calendar day as written. A bare `YYYY-MM-DD` maps to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let local = strip_offset(raw.trim());

    NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(local, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a numeric cell; anything that is not a finite number is `None`
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn strip_offset(s: &str) -> &str {
    match s.rsplit_once(' ') {
        Some((head, tail)) if is_offset(tail) => head.trim_end(),
        _ => s,
    }
}

fn is_offset(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 5
        && (bytes[0] == b'+' || bytes[0] == b'-')
        && bytes[1..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const EXPORT: &str = "\
type,sourceName,unit,startDate,endDate,value
HKQuantityTypeIdentifierBodyMass,Scale,kg,2024-01-15 07:30:00 +0900,2024-01-15 07:30:00 +0900,70.4
HKQuantityTypeIdentifierBodyMass,Scale,kg,2024-01-15 21:10:00 +0900,2024-01-15 21:10:00 +0900,71.0
HKQuantityTypeIdentifierBodyMass,Phone,kg,2024-01-16,2024-01-16,abc
HKQuantityTypeIdentifierBodyMass,Scale,kg,not-a-date,not-a-date,70.0
HKQuantityTypeIdentifierBodyMass,Scale,kg,2024-02-20 08:00:00 -0500,2024-02-20 08:00:00 -0500,69.8
";

    #[test]
    fn test_parse_timestamp_variants() {
        let with_offset = parse_timestamp("2024-01-15 23:59:59 +0900").unwrap();
        assert_eq!(with_offset.date(), day(2024, 1, 15));

        let negative = parse_timestamp("2024-01-15 01:00:00 -0500").unwrap();
        assert_eq!(negative.date(), day(2024, 1, 15));

        let date_only = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(date_only, day(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap());

        assert!(parse_timestamp("15/01/2024").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 70.5 "), Some(70.5));
        assert_eq!(parse_value("1200"), Some(1200.0));
        assert_eq!(parse_value("HKCategoryValueSleepAnalysisAsleep"), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn test_parse_samples_skips_bad_dates() {
        let samples = parse_samples(EXPORT.as_bytes(), &DateWindow::unbounded()).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].value, Some(70.4));
        assert_eq!(samples[0].source, "Scale");
        assert_eq!(samples[2].value, None);
        assert_eq!(samples[2].source, "Phone");
        assert_eq!(samples[3].timestamp.date(), day(2024, 2, 20));
    }

    #[test]
    fn test_parse_samples_skips_truncated_rows() {
        let csv = "\
type,sourceName,unit,startDate,endDate,value
T,Phone,kg,2024-01-01 08:00:00 +0900,x,70.0
T,Phone
T,Phone,kg,2024-01-02 08:00:00 +0900,x,71.0
";
        let samples = parse_samples(csv.as_bytes(), &DateWindow::unbounded()).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, Some(70.0));
        assert_eq!(samples[1].timestamp.date(), day(2024, 1, 2));
    }

    #[test]
    fn test_parse_samples_applies_window() {
        let window = DateWindow::new(Some(day(2024, 1, 16)), Some(day(2024, 1, 31)));
        let samples = parse_samples(EXPORT.as_bytes(), &window).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp.date(), day(2024, 1, 16));
    }

    #[test]
    fn test_missing_column() {
        let csv = "sourceName,value\nScale,70.0\n";
        let result = parse_samples(csv.as_bytes(), &DateWindow::unbounded());
        assert!(matches!(result, Err(ComputeError::MissingColumn(c)) if c == "startDate"));
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("BodyMass.csv")).unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();

        let source = CsvDirectorySource::new(dir.path());
        assert!(source.exists("BodyMass.csv"));
        assert!(!source.exists("StepCount.csv"));

        let samples = source
            .load("BodyMass.csv", &DateWindow::unbounded())
            .unwrap();
        assert_eq!(samples.len(), 4);

        let missing = source
            .load("StepCount.csv", &DateWindow::unbounded())
            .unwrap();
        assert!(missing.is_empty());
    }
}
