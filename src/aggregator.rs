//! Daily aggregation
//!
//! This module collapses raw samples into one value per calendar day.
//! - Samples are bucketed by the date of their timestamp
//! - Each bucket is reduced with the metric's [`Aggregation`]
//! - Samples without a numeric value are ignored

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::types::{Aggregation, DailyPoint, Sample};

/// Group samples by day and reduce each day's values.
///
/// The result is sorted by date and holds one point per day that had at least
/// one numeric sample.
pub fn aggregate_daily(samples: &[Sample], aggregation: Aggregation) -> Vec<DailyPoint> {
    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

    for sample in samples {
        if let Some(value) = sample.value {
            by_date
                .entry(sample.timestamp.date())
                .or_default()
                .push(value);
        }
    }

    by_date
        .into_iter()
        .map(|(date, values)| DailyPoint::new(date, reduce(&values, aggregation), values.len()))
        .collect()
}

/// Apply a reducer to a non-empty slice
fn reduce(values: &[f64], aggregation: Aggregation) -> f64 {
    match aggregation {
        Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
        Aggregation::Sum => values.iter().sum(),
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}
