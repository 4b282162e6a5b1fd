//! Gap segmentation
//!
//! Splits a date-ordered series into runs that can be drawn as one connected
//! line. A gap larger than the threshold ends the current run; runs with a
//! single point are dropped since they cannot form a line.

use tracing::debug;

use crate::types::{Dated, Segment};

/// Split `records` wherever consecutive dates are more than `gap_days` apart.
///
/// `records` must be sorted by date. A gap of exactly `gap_days` does not
/// split. Only segments with at least two records are returned.
pub fn split_by_gaps<T: Dated + Clone>(records: &[T], gap_days: i64) -> Vec<Segment<T>> {
    let Some((first, rest)) = records.split_first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut current: Segment<T> = vec![first.clone()];
    let mut prev_date = first.date();

    for record in rest {
        let date = record.date();
        let gap = (date - prev_date).num_days();

        if gap > gap_days {
            debug!(from = %prev_date, to = %date, gap, "splitting series at data gap");
            let finished = std::mem::replace(&mut current, vec![record.clone()]);
            if finished.len() > 1 {
                segments.push(finished);
            }
        } else {
            current.push(record.clone());
        }

        prev_date = date;
    }

    if current.len() > 1 {
        segments.push(current);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyPoint;
    use chrono::{Duration, NaiveDate};

    fn series(offsets: &[i64]) -> Vec<DailyPoint> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        offsets
            .iter()
            .map(|&o| DailyPoint::new(base + Duration::days(o), o as f64, 1))
            .collect()
    }

    #[test]
    fn test_gap_above_threshold_splits() {
        // 31-day gap between day 2 and day 33
        let data = series(&[0, 1, 2, 33, 34]);
        let segments = split_by_gaps(&data, 30);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 3);
        assert_eq!(segments[1].len(), 2);
    }

    #[test]
    fn test_gap_at_threshold_does_not_split() {
        let data = series(&[0, 1, 31, 32]);
        let segments = split_by_gaps(&data, 30);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 4);
    }

    #[test]
    fn test_singleton_segments_dropped() {
        // day 40 stands alone between two gaps
        let data = series(&[0, 1, 40, 80, 81, 82]);
        let segments = split_by_gaps(&data, 30);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0][0].value, 0.0);
        assert_eq!(segments[1][0].value, 80.0);
    }

    #[test]
    fn test_all_singletons_yield_nothing() {
        let data = series(&[0, 50, 100]);
        assert!(split_by_gaps(&data, 30).is_empty());
    }

    #[test]
    fn test_short_inputs() {
        assert!(split_by_gaps::<DailyPoint>(&[], 30).is_empty());
        assert!(split_by_gaps(&series(&[0]), 30).is_empty());
        assert_eq!(split_by_gaps(&series(&[0, 1]), 30).len(), 1);
    }
}
