//! Analysis-wide configuration
//!
//! The configuration is an explicit value handed to the analyzer at
//! construction. It can be built in code, loaded from JSON, or both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ComputeError;

/// Default gap (days) above which a trend line is broken
pub const DEFAULT_GAP_THRESHOLD_DAYS: i64 = 30;

/// Default minimum number of daily points before a metric is summarized
pub const DEFAULT_MIN_DATA_POINTS: usize = 5;

/// Default energy density used to turn a calorie deficit into mass (kcal/kg)
pub const DEFAULT_KCAL_PER_KG: f64 = 7200.0;

/// Inclusive calendar window applied when loading samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Window without bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// Settings shared by every metric in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// First day to load (inclusive)
    pub start_date: Option<NaiveDate>,
    /// Last day to load (inclusive); `None` means up to the latest sample
    pub end_date: Option<NaiveDate>,
    /// Overrides every metric's own rolling window when set
    pub rolling_window: Option<usize>,
    pub gap_threshold_days: i64,
    pub min_data_points: usize,
    pub kcal_per_kg: f64,
    /// Directory holding the exported CSV files
    pub data_dir: PathBuf,
    /// Directory receiving reports and charts
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            end_date: None,
            rolling_window: None,
            gap_threshold_days: DEFAULT_GAP_THRESHOLD_DAYS,
            min_data_points: DEFAULT_MIN_DATA_POINTS,
            kcal_per_kg: DEFAULT_KCAL_PER_KG,
            data_dir: PathBuf::from("data/csv"),
            output_dir: PathBuf::from("results"),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    /// Rolling window for a metric whose registry default is `metric_default`
    pub fn rolling_window_for(&self, metric_default: usize) -> usize {
        self.rolling_window.unwrap_or(metric_default)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ComputeError::InvalidConfig(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        if self.rolling_window == Some(0) {
            return Err(ComputeError::InvalidConfig(
                "rolling_window must be at least 1".to_string(),
            ));
        }
        if self.gap_threshold_days < 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "gap_threshold_days must not be negative, got {}",
                self.gap_threshold_days
            )));
        }
        if !self.kcal_per_kg.is_finite() || self.kcal_per_kg <= 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "kcal_per_kg must be positive, got {}",
                self.kcal_per_kg
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.start_date, Some(day(2023, 1, 1)));
        assert_eq!(config.gap_threshold_days, 30);
        assert_eq!(config.min_data_points, 5);
        assert_eq!(config.kcal_per_kg, 7200.0);
        assert_eq!(config.rolling_window_for(7), 7);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            AnalysisConfig::from_json(r#"{"rolling_window": 14, "kcal_per_kg": 7700}"#).unwrap();
        assert_eq!(config.rolling_window_for(7), 14);
        assert_eq!(config.kcal_per_kg, 7700.0);
        assert_eq!(config.min_data_points, 5);
        assert_eq!(config.gap_threshold_days, 30);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(AnalysisConfig::from_json(r#"{"kcal_per_kg": 0}"#).is_err());
        assert!(AnalysisConfig::from_json(
            r#"{"start_date": "2024-02-01", "end_date": "2024-01-01"}"#
        )
        .is_err());
        assert!(AnalysisConfig::from_json(r#"{"rolling_window": 0}"#).is_err());
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DateWindow::new(Some(day(2024, 1, 1)), Some(day(2024, 1, 31)));
        assert!(window.contains(day(2024, 1, 1)));
        assert!(window.contains(day(2024, 1, 31)));
        assert!(!window.contains(day(2023, 12, 31)));
        assert!(!window.contains(day(2024, 2, 1)));
        assert!(DateWindow::unbounded().contains(day(1999, 1, 1)));
    }
}
