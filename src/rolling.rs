//! Centered rolling averages
//!
//! The window around index `i` spans `window_days / 2` points on each side,
//! clipped at the series ends. Indices whose clipped window holds fewer than
//! [`MIN_ROLLING_SAMPLES`] points produce no output.

use crate::types::{DailyValue, RollingPoint};

/// Default rolling window in days
pub const DEFAULT_ROLLING_WINDOW: usize = 7;

/// Smallest window that produces a rolling value
pub const MIN_ROLLING_SAMPLES: usize = 3;

/// Centered moving average of a date-ordered series.
///
/// Each output point keeps the date of its center index. The window is
/// counted in points, not calendar days.
pub fn rolling_average<T: DailyValue>(series: &[T], window_days: usize) -> Vec<RollingPoint> {
    if series.len() < MIN_ROLLING_SAMPLES {
        return Vec::new();
    }

    let half = window_days / 2;
    let mut rolling = Vec::with_capacity(series.len());

    for (i, center) in series.iter().enumerate() {
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(series.len());
        let window = &series[start..end];

        if window.len() < MIN_ROLLING_SAMPLES {
            continue;
        }

        let sum: f64 = window.iter().map(|p| p.value()).sum();
        rolling.push(RollingPoint {
            date: center.date(),
            value: sum / window.len() as f64,
        });
    }

    rolling
}
