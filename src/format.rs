//! Human-readable number and report formatting

use std::fmt::Write;

use crate::pipeline::{Comparison, ComparisonSeries, MetricAnalysis};

/// Units that are always shown without decimals
const WHOLE_NUMBER_UNITS: [&str; 3] = ["kcal", "steps", "count"];

/// Format a value with its unit.
///
/// Energy and count units are rounded to whole numbers; every other unit uses
/// `decimal_places`. With `show_sign`, non-negative values get a leading `+`.
pub fn format_number(value: f64, unit: &str, decimal_places: usize, show_sign: bool) -> String {
    let sign = if show_sign && value >= 0.0 { "+" } else { "" };
    let decimals = if WHOLE_NUMBER_UNITS.contains(&unit) {
        0
    } else {
        decimal_places
    };

    if unit.is_empty() {
        format!("{sign}{value:.decimals$}")
    } else {
        format!("{sign}{value:.decimals$} {unit}")
    }
}

/// Plain-text statistics block for one metric
pub fn statistics_report(analysis: &MetricAnalysis) -> String {
    let config = analysis.config();
    let stats = &analysis.statistics;
    let unit = stats.unit.as_str();
    let dp = stats.decimal_places;
    let fmt = |v: f64| format_number(v, unit, dp, false);

    let mut out = String::new();
    let _ = writeln!(out, "{} statistics", config.display_name);
    let _ = writeln!(out, "{}", "-".repeat(50));
    let _ = writeln!(
        out,
        "Period:     {} to {} ({} days)",
        stats.start_date, stats.end_date, stats.total_days
    );
    let _ = writeln!(
        out,
        "Data days:  {} (coverage {:.1}%)",
        stats.data_days, stats.coverage_rate
    );

    let _ = writeln!(out);
    if let (Some(first), Some(last)) = (analysis.daily.first(), analysis.daily.last()) {
        let _ = writeln!(out, "Start:      {}", fmt(first.value));
        let _ = writeln!(out, "End:        {}", fmt(last.value));
    }
    let _ = writeln!(
        out,
        "Change:     {}",
        format_number(stats.total_change, unit, dp, true)
    );
    let _ = writeln!(out, "Mean:       {}", fmt(stats.basic.mean));
    let _ = writeln!(out, "Median:     {}", fmt(stats.basic.median));
    let _ = writeln!(out, "Min:        {}", fmt(stats.basic.min));
    let _ = writeln!(out, "Max:        {}", fmt(stats.basic.max));
    let _ = writeln!(out, "Std dev:    {}", fmt(stats.basic.std));
    let _ = writeln!(out, "Range:      {}", fmt(stats.basic.range));

    if let Some(rolling) = &stats.rolling {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}-day rolling average", analysis.rolling_window);
        let _ = writeln!(out, "Start:      {}", fmt(rolling.start_value));
        let _ = writeln!(out, "End:        {}", fmt(rolling.end_value));
        let _ = writeln!(
            out,
            "Change:     {}",
            format_number(rolling.change, unit, dp, true)
        );
    }

    if let Some(summary) = analysis.weight_prediction().and_then(|d| d.summary.as_ref()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Prediction accuracy ({} days)", summary.days);
        let _ = writeln!(out, "Mean error: {}", format_number(summary.mean_error, unit, 2, true));
        let _ = writeln!(out, "Max error:  {}", format_number(summary.max_error, unit, 2, true));
        let _ = writeln!(out, "Min error:  {}", format_number(summary.min_error, unit, 2, true));
        let _ = writeln!(
            out,
            "Actual change:      {}",
            format_number(summary.actual_change, unit, dp, true)
        );
        let _ = writeln!(
            out,
            "Theoretical change: {}",
            format_number(summary.theoretical_change, unit, dp, true)
        );
    }

    out
}

/// Plain-text summary of a two-metric comparison
pub fn comparison_report(comparison: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} vs {}",
        comparison.primary.metric.config().display_name,
        comparison.secondary.metric.config().display_name
    );
    let _ = writeln!(out, "{}", "-".repeat(50));
    let _ = writeln!(
        out,
        "Common period: {} to {}",
        comparison.start_date, comparison.end_date
    );
    for series in [&comparison.primary, &comparison.secondary] {
        let _ = writeln!(out, "{}", series_line(series));
    }
    out
}

fn series_line(series: &ComparisonSeries) -> String {
    let config = series.metric.config();
    let mean = series
        .statistics
        .as_ref()
        .map(|s| format_number(s.mean, config.unit, config.decimal_places, false))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}: mean {}, change {} ({} days)",
        config.display_name,
        mean,
        format_number(series.total_change, config.unit, config.decimal_places, true),
        series.daily.len()
    )
}
