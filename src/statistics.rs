//! Descriptive statistics
//!
//! Summaries over a daily series: central tendency, spread, the period covered
//! and how much of it has data.

use crate::types::{BasicStatistics, DailyValue, RollingPoint, RollingStatistics, StatisticsSummary};

/// Count, mean, median, min, max, sample standard deviation and range.
///
/// Returns `None` for an empty slice. The standard deviation uses the n - 1
/// denominator and is 0 for a single value.
pub fn basic_statistics(values: &[f64]) -> Option<BasicStatistics> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(BasicStatistics {
        count,
        mean,
        median: median(values),
        min,
        max,
        std: sample_std_dev(values, mean),
        range: max - min,
    })
}

/// Full summary of a daily series and its rolling average.
///
/// `daily` must be sorted by date. Returns `None` when `daily` is empty.
pub fn summarize<T: DailyValue>(
    daily: &[T],
    rolling: &[RollingPoint],
    unit: &str,
    decimal_places: usize,
) -> Option<StatisticsSummary> {
    let values: Vec<f64> = daily.iter().map(|p| p.value()).collect();
    let basic = basic_statistics(&values)?;

    let first = daily.first()?;
    let last = daily.last()?;
    let start_date = first.date();
    let end_date = last.date();
    let total_days = (end_date - start_date).num_days() + 1;
    let data_days = daily.len();

    Some(StatisticsSummary {
        basic,
        start_date,
        end_date,
        total_days,
        data_days,
        coverage_rate: data_days as f64 / total_days as f64 * 100.0,
        total_change: last.value() - first.value(),
        unit: unit.to_string(),
        decimal_places,
        rolling: rolling_statistics(rolling),
    })
}

/// Start, end and change of a rolling series
pub fn rolling_statistics(rolling: &[RollingPoint]) -> Option<RollingStatistics> {
    let first = rolling.first()?;
    let last = rolling.last()?;
    Some(RollingStatistics {
        start_value: first.value,
        end_value: last.value,
        change: last.value - first.value,
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyPoint;
    use chrono::{Duration, NaiveDate};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    #[test]
    fn test_basic_statistics() {
        let stats = basic_statistics(&[70.0, 71.0, 72.0]).unwrap();

        assert_eq!(stats.count, 3);
        assert!((stats.mean - 71.0).abs() < 1e-12);
        assert!((stats.median - 71.0).abs() < 1e-12);
        assert_eq!(stats.min, 70.0);
        assert_eq!(stats.max, 72.0);
        assert!((stats.range - 2.0).abs() < 1e-12);
        // sample standard deviation of 70, 71, 72 is exactly 1
        assert!((stats.std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_even_count_median() {
        let stats = basic_statistics(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((stats.median - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_has_zero_std() {
        let stats = basic_statistics(&[65.0]).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.range, 0.0);
        assert!(basic_statistics(&[]).is_none());
    }

    #[test]
    fn test_summary_period_metadata() {
        let daily = vec![
            DailyPoint::new(day(0), 70.0, 1),
            DailyPoint::new(day(1), 71.0, 2),
            DailyPoint::new(day(3), 72.0, 1),
        ];
        let rolling = vec![
            RollingPoint { date: day(0), value: 70.5 },
            RollingPoint { date: day(3), value: 71.5 },
        ];

        let summary = summarize(&daily, &rolling, "kg", 1).unwrap();

        assert_eq!(summary.start_date, day(0));
        assert_eq!(summary.end_date, day(3));
        assert_eq!(summary.total_days, 4);
        assert_eq!(summary.data_days, 3);
        assert!((summary.coverage_rate - 75.0).abs() < 1e-9);
        assert!((summary.total_change - 2.0).abs() < 1e-12);
        assert_eq!(summary.unit, "kg");

        let rolling_stats = summary.rolling.unwrap();
        assert!((rolling_stats.change - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_total_change_is_last_minus_first() {
        // mean-based change would be different
        let daily = vec![
            DailyPoint::new(day(0), 80.0, 1),
            DailyPoint::new(day(1), 60.0, 1),
            DailyPoint::new(day(2), 78.0, 1),
        ];
        let summary = summarize(&daily, &[], "kg", 1).unwrap();
        assert!((summary.total_change - (-2.0)).abs() < 1e-12);
        assert!(summary.rolling.is_none());
    }

    #[test]
    fn test_empty_series_has_no_summary() {
        assert!(summarize::<DailyPoint>(&[], &[], "kg", 1).is_none());
    }
}
