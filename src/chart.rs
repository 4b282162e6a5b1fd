//! PNG trend charts
//!
//! Daily values are drawn as thin lines broken at data gaps with the
//! raw points scattered on top, and the rolling average as a thick line.
//! The x axis counts days from the first plotted date so gaps keep their
//! real width.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use plotters::coord::types::{RangedCoordf64, RangedCoordi32};
use plotters::prelude::*;
use tracing::debug;

use crate::encoder::{artifact_path, today_tag};
use crate::error::ComputeError;
use crate::pipeline::{Comparison, MetricAnalysis, Renderer, WeightPredictionDetail};
use crate::registry::{Category, MetricId};
use crate::segments::split_by_gaps;
use crate::types::{DailyValue, Segment};

/// Default image size in pixels
pub const DEFAULT_CHART_SIZE: (u32, u32) = (1400, 800);

type DayChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordi32, RangedCoordf64>>;

fn render_err<E: std::fmt::Display>(e: E) -> ComputeError {
    ComputeError::RenderError(e.to_string())
}

/// Line color of a metric's daily series
pub fn metric_color(metric: MetricId) -> RGBColor {
    match metric {
        MetricId::BodyWeight | MetricId::WeightPrediction => RGBColor(31, 119, 180),
        MetricId::CalorieBalance => RGBColor(44, 160, 44),
        _ => match metric.config().category {
            Category::BodyComposition => RGBColor(23, 190, 207),
            Category::Nutrition => RGBColor(255, 127, 14),
            Category::Activity => RGBColor(148, 103, 189),
            Category::SleepAndVitals => RGBColor(140, 86, 75),
            Category::Energy => RGBColor(44, 160, 44),
        },
    }
}

const ROLLING_COLOR: RGBColor = RGBColor(214, 39, 40);

/// Days from `origin` to `date`
pub fn day_offset(origin: NaiveDate, date: NaiveDate) -> i32 {
    (date - origin).num_days() as i32
}

/// Y range covering `values` with 5% headroom on each side.
///
/// A flat or empty series gets a unit-wide band so the axis never collapses.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    if span <= f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = span * 0.05;
    (min - pad)..(max + pad)
}

fn to_xy<T: DailyValue>(origin: NaiveDate, segment: &[T]) -> Vec<(i32, f64)> {
    segment
        .iter()
        .map(|p| (day_offset(origin, p.date()), p.value()))
        .collect()
}

fn draw_segments<DB: DrawingBackend, T: DailyValue>(
    chart: &mut DayChart<'_, DB>,
    origin: NaiveDate,
    segments: &[Segment<T>],
    style: ShapeStyle,
    label: &str,
) -> Result<(), ComputeError> {
    for (i, segment) in segments.iter().enumerate() {
        let series = chart
            .draw_series(LineSeries::new(to_xy(origin, segment), style))
            .map_err(render_err)?;
        if i == 0 {
            series
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }
    Ok(())
}

fn draw_points<DB: DrawingBackend, T: DailyValue>(
    chart: &mut DayChart<'_, DB>,
    origin: NaiveDate,
    points: &[T],
    color: RGBColor,
) -> Result<(), ComputeError> {
    chart
        .draw_series(
            to_xy(origin, points)
                .into_iter()
                .map(|(x, y)| Circle::new((x, y), 2, color.mix(0.5).filled())),
        )
        .map_err(render_err)?;
    Ok(())
}

fn x_range(origin: NaiveDate, end: NaiveDate) -> Range<i32> {
    0..day_offset(origin, end).max(1) + 1
}

/// Write a trend chart for one metric
pub fn render_trend_chart(
    analysis: &MetricAnalysis,
    path: &Path,
    size: (u32, u32),
) -> Result<(), ComputeError> {
    if let Some(detail) = analysis.weight_prediction() {
        return render_prediction_chart(analysis, detail, path, size);
    }

    let config = analysis.config();
    let stats = &analysis.statistics;
    let origin = stats.start_date;
    let color = metric_color(analysis.metric);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let caption = format!(
        "{} ({} to {})",
        config.title, stats.start_date, stats.end_date
    );
    let y_range = padded_range(analysis.daily.iter().map(|p| p.value));
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range(origin, stats.end_date), y_range)
        .map_err(render_err)?;

    let date_label = |x: &i32| (origin + Duration::days(i64::from(*x))).format("%Y-%m").to_string();
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&date_label)
        .x_desc("Date")
        .y_desc(config.unit)
        .draw()
        .map_err(render_err)?;

    draw_segments(
        &mut chart,
        origin,
        &analysis.daily_segments(),
        color.mix(0.7).stroke_width(1),
        config.display_name,
    )?;
    let rolling_label = format!("{}-day rolling average", analysis.rolling_window);
    draw_segments(
        &mut chart,
        origin,
        &analysis.rolling_segments(),
        ROLLING_COLOR.stroke_width(3),
        &rolling_label,
    )?;
    draw_points(&mut chart, origin, &analysis.daily, color)?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

fn render_prediction_chart(
    analysis: &MetricAnalysis,
    detail: &WeightPredictionDetail,
    path: &Path,
    size: (u32, u32),
) -> Result<(), ComputeError> {
    let config = analysis.config();
    let stats = &analysis.statistics;
    let origin = stats.start_date;
    let gap = analysis.gap_threshold_days;
    let actual_color = metric_color(analysis.metric);
    let theoretical_color = ROLLING_COLOR;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let y_range = padded_range(
        analysis
            .daily
            .iter()
            .chain(detail.theoretical_daily.iter())
            .map(|p| p.value),
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} ({} to {})", config.title, stats.start_date, stats.end_date),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range(origin, stats.end_date), y_range)
        .map_err(render_err)?;

    let date_label = |x: &i32| (origin + Duration::days(i64::from(*x))).format("%Y-%m").to_string();
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&date_label)
        .x_desc("Date")
        .y_desc(config.unit)
        .draw()
        .map_err(render_err)?;

    draw_segments(
        &mut chart,
        origin,
        &analysis.daily_segments(),
        actual_color.mix(0.5).stroke_width(1),
        "Actual weight",
    )?;
    draw_segments(
        &mut chart,
        origin,
        &split_by_gaps(&detail.theoretical_daily, gap),
        theoretical_color.mix(0.5).stroke_width(1),
        "Theoretical weight",
    )?;
    draw_segments(
        &mut chart,
        origin,
        &analysis.rolling_segments(),
        actual_color.stroke_width(3),
        "Actual weight (rolling)",
    )?;
    draw_segments(
        &mut chart,
        origin,
        &split_by_gaps(&detail.theoretical_rolling, gap),
        theoretical_color.stroke_width(3),
        "Theoretical weight (rolling)",
    )?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Write a dual-axis chart of two metrics over their common period
pub fn render_comparison_chart(
    comparison: &Comparison,
    path: &Path,
    size: (u32, u32),
) -> Result<(), ComputeError> {
    let primary = comparison.primary.metric.config();
    let secondary = comparison.secondary.metric.config();
    let origin = comparison.start_date;
    let gap = comparison.gap_threshold_days;
    let primary_color = metric_color(comparison.primary.metric);
    let secondary_color = RGBColor(255, 127, 14);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let x = x_range(origin, comparison.end_date);
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "{} vs {} ({} to {})",
                primary.display_name, secondary.display_name, comparison.start_date, comparison.end_date
            ),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(
            x.clone(),
            padded_range(comparison.primary.daily.iter().map(|p| p.value)),
        )
        .map_err(render_err)?
        .set_secondary_coord(
            x,
            padded_range(comparison.secondary.daily.iter().map(|p| p.value)),
        );

    let date_label = |x: &i32| (origin + Duration::days(i64::from(*x))).format("%Y-%m").to_string();
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&date_label)
        .y_desc(format!("{} ({})", primary.display_name, primary.unit))
        .draw()
        .map_err(render_err)?;
    chart
        .configure_secondary_axes()
        .y_desc(format!("{} ({})", secondary.display_name, secondary.unit))
        .draw()
        .map_err(render_err)?;

    for (i, segment) in split_by_gaps(&comparison.primary.rolling, gap).iter().enumerate() {
        let style = primary_color.stroke_width(3);
        let series = chart
            .draw_series(LineSeries::new(to_xy(origin, segment), style))
            .map_err(render_err)?;
        if i == 0 {
            series
                .label(primary.display_name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }
    for (i, segment) in split_by_gaps(&comparison.secondary.rolling, gap).iter().enumerate() {
        let style = secondary_color.stroke_width(3);
        let series = chart
            .draw_secondary_series(LineSeries::new(to_xy(origin, segment), style))
            .map_err(render_err)?;
        if i == 0 {
            series
                .label(secondary.display_name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Renderer writing PNG charts
pub struct ChartRenderer {
    output_dir: PathBuf,
    date_tag: String,
    size: (u32, u32),
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            date_tag: today_tag(),
            size: DEFAULT_CHART_SIZE,
        }
    }

    /// Use a fixed date tag in file names instead of today's date
    pub fn with_date_tag(mut self, date_tag: impl Into<String>) -> Self {
        self.date_tag = date_tag.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    fn path_for(&self, stem: &str) -> Result<PathBuf, ComputeError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(artifact_path(&self.output_dir, stem, &self.date_tag, "png"))
    }
}

impl Renderer for ChartRenderer {
    fn render_metric(&self, analysis: &MetricAnalysis) -> Result<Vec<PathBuf>, ComputeError> {
        let path = self.path_for(analysis.metric.as_str())?;
        render_trend_chart(analysis, &path, self.size)?;
        debug!(path = %path.display(), "wrote chart");
        Ok(vec![path])
    }

    fn render_comparison(&self, comparison: &Comparison) -> Result<Vec<PathBuf>, ComputeError> {
        let stem = format!(
            "{}_vs_{}",
            comparison.primary.metric.as_str(),
            comparison.secondary.metric.as_str()
        );
        let path = self.path_for(&stem)?;
        render_comparison_chart(comparison, &path, self.size)?;
        debug!(path = %path.display(), "wrote comparison chart");
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyPoint;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    #[test]
    fn test_padded_range() {
        let range = padded_range([10.0, 20.0]);
        assert!((range.start - 9.5).abs() < 1e-12);
        assert!((range.end - 20.5).abs() < 1e-12);
    }

    #[test]
    fn test_flat_and_empty_ranges_do_not_collapse() {
        assert_eq!(padded_range([5.0, 5.0]), 4.0..6.0);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([f64::NAN, 3.0]), 2.0..4.0);
    }

    #[test]
    fn test_gaps_keep_their_width_on_the_axis() {
        let points = vec![
            DailyPoint::new(day(0), 1.0, 1),
            DailyPoint::new(day(45), 2.0, 1),
        ];
        assert_eq!(to_xy(day(0), &points), vec![(0, 1.0), (45, 2.0)]);
        assert_eq!(x_range(day(0), day(45)), 0..46);
        assert_eq!(x_range(day(0), day(0)), 0..2);
    }

    #[test]
    fn test_artifact_name() {
        let renderer = ChartRenderer::new("/tmp/out").with_date_tag("20240105");
        assert_eq!(
            artifact_path(&renderer.output_dir, "body_weight", &renderer.date_tag, "png"),
            PathBuf::from("/tmp/out/body_weight_20240105.png")
        );
    }
}
