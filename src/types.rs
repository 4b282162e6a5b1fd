//! Core types for the health-trends pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw samples, daily points, rolling points, derived energy-balance
//! records and statistics summaries.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anything that sits on a calendar day
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// A dated record carrying one numeric value per day
pub trait DailyValue: Dated {
    fn value(&self) -> f64;
}

/// Reducer applied to all samples that fall on the same day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Mean,
    Sum,
    Min,
    Max,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            other => Err(format!("unknown aggregation '{}'", other)),
        }
    }
}

/// One raw measurement, one per input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Local timestamp of the measurement (offset already discarded)
    pub timestamp: NaiveDateTime,
    /// Parsed value; `None` when the raw text was not a finite number
    pub value: Option<f64>,
    /// Recording app or device, informational only
    pub source: String,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: Option<f64>, source: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            source: source.into(),
        }
    }
}

impl Dated for Sample {
    fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// One day of a metric after reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// Number of samples that contributed to `value` (always >= 1)
    pub sample_count: usize,
}

impl DailyPoint {
    pub fn new(date: NaiveDate, value: f64, sample_count: usize) -> Self {
        Self {
            date,
            value,
            sample_count,
        }
    }
}

impl Dated for DailyPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl DailyValue for DailyPoint {
    fn value(&self) -> f64 {
        self.value
    }
}

/// Centered moving average tagged with the date of its center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl Dated for RollingPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl DailyValue for RollingPoint {
    fn value(&self) -> f64 {
        self.value
    }
}

/// Contiguous run of records with no gap above the configured threshold
pub type Segment<T> = Vec<T>;

/// Per-day energy balance (kcal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieBalanceRecord {
    pub date: NaiveDate,
    pub intake: f64,
    pub basal: f64,
    pub active: f64,
    /// intake - basal - active
    pub balance: f64,
}

impl Dated for CalorieBalanceRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Observed weight next to the weight implied by accumulated energy balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPredictionRecord {
    pub date: NaiveDate,
    pub actual_weight: f64,
    pub theoretical_weight: f64,
    /// actual_weight - theoretical_weight
    pub prediction_error: f64,
    /// Running sum of `daily_balance` since the first common day (kcal)
    pub cumulative_deficit: f64,
    pub daily_balance: f64,
    pub daily_intake: f64,
    pub daily_basal: f64,
    pub daily_active: f64,
}

impl Dated for WeightPredictionRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Descriptive statistics over a value sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n - 1), 0 for a single value
    pub std: f64,
    pub range: f64,
}

/// First/last value of the rolling series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStatistics {
    pub start_value: f64,
    pub end_value: f64,
    pub change: f64,
}

/// Statistics plus the period they cover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    #[serde(flatten)]
    pub basic: BasicStatistics,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Calendar days spanned, both ends included
    pub total_days: i64,
    /// Days with a recorded value
    pub data_days: usize,
    /// data_days / total_days * 100
    pub coverage_rate: f64,
    /// Last daily value minus first daily value
    pub total_change: f64,
    pub unit: String,
    pub decimal_places: usize,
    pub rolling: Option<RollingStatistics>,
}

/// Accuracy of the energy-balance weight model over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub days: usize,
    pub mean_error: f64,
    pub max_error: f64,
    pub min_error: f64,
    pub actual_change: f64,
    pub theoretical_change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_parse() {
        assert_eq!("mean".parse::<Aggregation>(), Ok(Aggregation::Mean));
        assert_eq!(" SUM ".parse::<Aggregation>(), Ok(Aggregation::Sum));
        assert!("median".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_aggregation_serde() {
        let json = serde_json::to_string(&Aggregation::Max).unwrap();
        assert_eq!(json, "\"max\"");
        let back: Aggregation = serde_json::from_str("\"min\"").unwrap();
        assert_eq!(back, Aggregation::Min);
    }

    #[test]
    fn test_sample_date_drops_time() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let sample = Sample::new(ts, Some(1.0), "watch");
        assert_eq!(sample.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
