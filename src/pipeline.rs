//! Pipeline orchestration
//!
//! This module provides the public API for health-trends.
//! It drives one metric through the stages
//! `Loaded -> Aggregated -> Summarized -> Rendered`, runs batches of metrics,
//! and builds two-metric comparisons over their common period.
//!
//! Sparse data halts only the affected metric and is reported as
//! [`AnalysisOutcome::Halted`]. Only faults such as an unreadable file are
//! returned as [`ComputeError`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::{CsvDirectorySource, SampleSource};
use crate::aggregator::aggregate_daily;
use crate::config::AnalysisConfig;
use crate::derived::{
    actual_weight_series, aggregate_components, balance_series, calorie_balance,
    prediction_summary, theoretical_weight_series, weight_prediction, DerivationFailure,
};
use crate::error::ComputeError;
use crate::registry::{Combinator, Component, MetricConfig, MetricId, MetricSource};
use crate::rolling::rolling_average;
use crate::segments::split_by_gaps;
use crate::statistics::{basic_statistics, summarize};
use crate::types::{
    Aggregation, BasicStatistics, CalorieBalanceRecord, DailyPoint, DailyValue, Dated, PredictionSummary,
    RollingPoint, Sample, Segment, StatisticsSummary, WeightPredictionRecord,
};

/// Pipeline stage of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    Aggregated,
    Summarized,
    Rendered,
}

/// Why a metric stopped before completing
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum HaltReason {
    #[error("no samples found")]
    NoSamples,

    #[error("not enough data: {available} days (minimum {required})")]
    InsufficientData { available: usize, required: usize },

    #[error("{0}")]
    Derivation(DerivationFailure),

    #[error("series have no period in common")]
    NoCommonPeriod,
}

/// Extra output of derived metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DerivedDetail {
    None,
    CalorieBalance(Vec<CalorieBalanceRecord>),
    WeightPrediction(WeightPredictionDetail),
}

/// Weight prediction records with their own rolling series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightPredictionDetail {
    pub records: Vec<WeightPredictionRecord>,
    pub theoretical_daily: Vec<DailyPoint>,
    pub theoretical_rolling: Vec<RollingPoint>,
    pub summary: Option<PredictionSummary>,
}

/// Everything computed for one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAnalysis {
    pub metric: MetricId,
    pub stage: Stage,
    pub rolling_window: usize,
    pub gap_threshold_days: i64,
    pub daily: Vec<DailyPoint>,
    pub rolling: Vec<RollingPoint>,
    pub statistics: StatisticsSummary,
    pub detail: DerivedDetail,
    /// Files written by the renderers
    pub artifacts: Vec<PathBuf>,
}

impl MetricAnalysis {
    pub fn config(&self) -> &'static MetricConfig {
        self.metric.config()
    }

    /// Daily series split at data gaps
    pub fn daily_segments(&self) -> Vec<Segment<DailyPoint>> {
        split_by_gaps(&self.daily, self.gap_threshold_days)
    }

    /// Rolling series split at data gaps
    pub fn rolling_segments(&self) -> Vec<Segment<RollingPoint>> {
        split_by_gaps(&self.rolling, self.gap_threshold_days)
    }

    pub fn weight_prediction(&self) -> Option<&WeightPredictionDetail> {
        match &self.detail {
            DerivedDetail::WeightPrediction(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Result of running one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed(Box<MetricAnalysis>),
    Halted {
        metric: MetricId,
        /// Last stage reached
        stage: Stage,
        reason: HaltReason,
    },
}

impl AnalysisOutcome {
    pub fn metric(&self) -> MetricId {
        match self {
            AnalysisOutcome::Completed(analysis) => analysis.metric,
            AnalysisOutcome::Halted { metric, .. } => *metric,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, AnalysisOutcome::Completed(_))
    }

    pub fn analysis(&self) -> Option<&MetricAnalysis> {
        match self {
            AnalysisOutcome::Completed(analysis) => Some(analysis),
            AnalysisOutcome::Halted { .. } => None,
        }
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        match self {
            AnalysisOutcome::Completed(_) => None,
            AnalysisOutcome::Halted { reason, .. } => Some(reason),
        }
    }
}

/// One side of a two-metric comparison, restricted to the common period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSeries {
    pub metric: MetricId,
    pub daily: Vec<DailyPoint>,
    pub rolling: Vec<RollingPoint>,
    pub statistics: Option<BasicStatistics>,
    /// Last minus first daily value inside the common period
    pub total_change: f64,
}

/// Two metrics over their common period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub primary: ComparisonSeries,
    pub secondary: ComparisonSeries,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub gap_threshold_days: i64,
    pub artifacts: Vec<PathBuf>,
}

/// Result of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Completed(Box<Comparison>),
    Abandoned {
        /// Metric whose own analysis halted, if any
        metric: Option<MetricId>,
        reason: HaltReason,
    },
}

impl ComparisonOutcome {
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            ComparisonOutcome::Completed(comparison) => Some(comparison),
            ComparisonOutcome::Abandoned { .. } => None,
        }
    }
}

/// Per-metric result of a batch run
#[derive(Debug)]
pub struct BatchEntry {
    pub metric: MetricId,
    pub result: Result<AnalysisOutcome, ComputeError>,
}

impl BatchEntry {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.is_completed())
    }
}

/// Output stage of the pipeline
pub trait Renderer {
    /// Render one metric, returning the files written
    fn render_metric(&self, analysis: &MetricAnalysis) -> Result<Vec<PathBuf>, ComputeError>;

    /// Render a comparison, returning the files written
    fn render_comparison(&self, comparison: &Comparison) -> Result<Vec<PathBuf>, ComputeError>;
}

/// Several renderers run in order
#[derive(Default)]
pub struct RendererSet {
    renderers: Vec<Box<dyn Renderer>>,
}

impl RendererSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.push(renderer);
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Renderer for RendererSet {
    fn render_metric(&self, analysis: &MetricAnalysis) -> Result<Vec<PathBuf>, ComputeError> {
        let mut written = Vec::new();
        for renderer in &self.renderers {
            written.extend(renderer.render_metric(analysis)?);
        }
        Ok(written)
    }

    fn render_comparison(&self, comparison: &Comparison) -> Result<Vec<PathBuf>, ComputeError> {
        let mut written = Vec::new();
        for renderer in &self.renderers {
            written.extend(renderer.render_comparison(comparison)?);
        }
        Ok(written)
    }
}

/// Samples as they come out of the Loaded stage
enum Loaded {
    Direct(Vec<Sample>, Aggregation),
    Components(BTreeMap<Component, Vec<Sample>>, Combinator),
}

/// Daily series and derived detail after the Aggregated stage
struct Aggregated {
    daily: Vec<DailyPoint>,
    detail: DerivedDetail,
}

/// Orchestrates metric analyses against one sample source
pub struct HealthAnalyzer {
    config: AnalysisConfig,
    source: Box<dyn SampleSource>,
}

impl HealthAnalyzer {
    /// Create an analyzer over an arbitrary sample source
    pub fn new(config: AnalysisConfig, source: Box<dyn SampleSource>) -> Self {
        Self { config, source }
    }

    /// Create an analyzer reading CSV exports from `config.data_dir`
    pub fn with_data_dir(config: AnalysisConfig) -> Self {
        let source = CsvDirectorySource::new(config.data_dir.clone());
        Self::new(config, Box::new(source))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn SampleSource {
        self.source.as_ref()
    }

    /// Run a metric through Loaded, Aggregated and Summarized.
    pub fn analyze(&self, metric: MetricId) -> Result<AnalysisOutcome, ComputeError> {
        let config = metric.config();
        info!(metric = %metric, "starting analysis");

        // Loaded
        let loaded = self.load(config)?;
        // Derived metrics name their missing components during aggregation
        if matches!(&loaded, Loaded::Direct(samples, _) if samples.is_empty()) {
            warn!(metric = %metric, "no samples found");
            return Ok(halted(metric, Stage::Loaded, HaltReason::NoSamples));
        }

        // Aggregated
        let aggregated = match self.aggregate(loaded) {
            Ok(aggregated) => aggregated,
            Err(failure) => {
                return Ok(halted(metric, Stage::Loaded, HaltReason::Derivation(failure)));
            }
        };
        info!(metric = %metric, days = aggregated.daily.len(), "aggregated daily series");

        if aggregated.daily.len() < self.config.min_data_points {
            warn!(
                metric = %metric,
                available = aggregated.daily.len(),
                required = self.config.min_data_points,
                "not enough daily data"
            );
            return Ok(halted(
                metric,
                Stage::Aggregated,
                HaltReason::InsufficientData {
                    available: aggregated.daily.len(),
                    required: self.config.min_data_points,
                },
            ));
        }

        // Summarized
        let rolling_window = self.config.rolling_window_for(config.rolling_window);
        let rolling = rolling_average(&aggregated.daily, rolling_window);
        debug!(metric = %metric, window = rolling_window, points = rolling.len(), "rolling average");

        let Some(statistics) =
            summarize(&aggregated.daily, &rolling, config.unit, config.decimal_places)
        else {
            return Ok(halted(metric, Stage::Aggregated, HaltReason::NoSamples));
        };

        let detail = match aggregated.detail {
            DerivedDetail::WeightPrediction(mut detail) => {
                detail.theoretical_rolling = rolling_average(&detail.theoretical_daily, rolling_window);
                DerivedDetail::WeightPrediction(detail)
            }
            other => other,
        };

        info!(metric = %metric, "analysis summarized");
        Ok(AnalysisOutcome::Completed(Box::new(MetricAnalysis {
            metric,
            stage: Stage::Summarized,
            rolling_window,
            gap_threshold_days: self.config.gap_threshold_days,
            daily: aggregated.daily,
            rolling,
            statistics,
            detail,
            artifacts: Vec::new(),
        })))
    }

    /// Advance a completed analysis to Rendered. Halted outcomes pass through.
    pub fn render(
        &self,
        outcome: AnalysisOutcome,
        renderer: &dyn Renderer,
    ) -> Result<AnalysisOutcome, ComputeError> {
        match outcome {
            AnalysisOutcome::Completed(mut analysis) => {
                let written = renderer.render_metric(&analysis)?;
                for path in &written {
                    info!(metric = %analysis.metric, path = %path.display(), "rendered");
                }
                analysis.artifacts.extend(written);
                analysis.stage = Stage::Rendered;
                Ok(AnalysisOutcome::Completed(analysis))
            }
            halted => Ok(halted),
        }
    }

    /// Analyze and, when a renderer is given, render one metric
    pub fn run(
        &self,
        metric: MetricId,
        renderer: Option<&dyn Renderer>,
    ) -> Result<AnalysisOutcome, ComputeError> {
        let outcome = self.analyze(metric)?;
        match renderer {
            Some(renderer) => self.render(outcome, renderer),
            None => Ok(outcome),
        }
    }

    /// Run several metrics; a failure in one never stops the others
    pub fn analyze_batch(
        &self,
        metrics: &[MetricId],
        renderer: Option<&dyn Renderer>,
    ) -> Vec<BatchEntry> {
        metrics
            .iter()
            .enumerate()
            .map(|(i, &metric)| {
                info!(metric = %metric, "[{}/{}] analyzing", i + 1, metrics.len());
                let result = self.run(metric, renderer);
                match &result {
                    Ok(AnalysisOutcome::Halted { reason, .. }) => {
                        warn!(metric = %metric, %reason, "analysis halted")
                    }
                    Err(e) => warn!(metric = %metric, error = %e, "analysis failed"),
                    Ok(_) => {}
                }
                BatchEntry { metric, result }
            })
            .collect()
    }

    /// Compare two metrics over the period both have data for
    pub fn compare(
        &self,
        primary: MetricId,
        secondary: MetricId,
    ) -> Result<ComparisonOutcome, ComputeError> {
        info!(primary = %primary, secondary = %secondary, "starting comparison");

        let first = match self.analyze(primary)? {
            AnalysisOutcome::Completed(analysis) => analysis,
            AnalysisOutcome::Halted { reason, .. } => {
                return Ok(ComparisonOutcome::Abandoned {
                    metric: Some(primary),
                    reason,
                })
            }
        };
        let second = match self.analyze(secondary)? {
            AnalysisOutcome::Completed(analysis) => analysis,
            AnalysisOutcome::Halted { reason, .. } => {
                return Ok(ComparisonOutcome::Abandoned {
                    metric: Some(secondary),
                    reason,
                })
            }
        };

        let Some((start_date, end_date)) = common_period(&first.daily, &second.daily) else {
            warn!(primary = %primary, secondary = %secondary, "no common period");
            return Ok(ComparisonOutcome::Abandoned {
                metric: None,
                reason: HaltReason::NoCommonPeriod,
            });
        };
        info!(%start_date, %end_date, "common period");

        let primary_series = comparison_series(&first, start_date, end_date);
        let secondary_series = comparison_series(&second, start_date, end_date);

        if primary_series.daily.is_empty() || secondary_series.daily.is_empty() {
            return Ok(ComparisonOutcome::Abandoned {
                metric: None,
                reason: HaltReason::NoCommonPeriod,
            });
        }

        Ok(ComparisonOutcome::Completed(Box::new(Comparison {
            primary: primary_series,
            secondary: secondary_series,
            start_date,
            end_date,
            gap_threshold_days: self.config.gap_threshold_days,
            artifacts: Vec::new(),
        })))
    }

    /// Render a completed comparison. Abandoned outcomes pass through.
    pub fn render_comparison(
        &self,
        outcome: ComparisonOutcome,
        renderer: &dyn Renderer,
    ) -> Result<ComparisonOutcome, ComputeError> {
        match outcome {
            ComparisonOutcome::Completed(mut comparison) => {
                let written = renderer.render_comparison(&comparison)?;
                comparison.artifacts.extend(written);
                Ok(ComparisonOutcome::Completed(comparison))
            }
            abandoned => Ok(abandoned),
        }
    }

    fn load(&self, config: &MetricConfig) -> Result<Loaded, ComputeError> {
        let window = self.config.window();
        match config.source {
            MetricSource::Direct { file, aggregation } => {
                let samples = self.source.load(file, &window)?;
                info!(metric = %config.id, file, samples = samples.len(), "loaded samples");
                Ok(Loaded::Direct(samples, aggregation))
            }
            MetricSource::Derived(combinator) => {
                let mut components = BTreeMap::new();
                for component in combinator.components() {
                    let samples = self.source.load(component.file_name(), &window)?;
                    if samples.is_empty() {
                        warn!(component = %component, file = component.file_name(), "component has no data");
                    } else {
                        info!(component = %component, samples = samples.len(), "loaded component");
                    }
                    components.insert(*component, samples);
                }
                Ok(Loaded::Components(components, combinator))
            }
        }
    }

    fn aggregate(&self, loaded: Loaded) -> Result<Aggregated, DerivationFailure> {
        match loaded {
            Loaded::Direct(samples, aggregation) => Ok(Aggregated {
                daily: aggregate_daily(&samples, aggregation),
                detail: DerivedDetail::None,
            }),
            Loaded::Components(raw, Combinator::CalorieBalance) => {
                let records = calorie_balance(&aggregate_components(&raw))?;
                Ok(Aggregated {
                    daily: balance_series(&records),
                    detail: DerivedDetail::CalorieBalance(records),
                })
            }
            Loaded::Components(raw, Combinator::WeightPrediction) => {
                let records = weight_prediction(&aggregate_components(&raw), self.config.kcal_per_kg)?;
                let summary = prediction_summary(&records);
                if let Some(summary) = &summary {
                    info!(
                        days = summary.days,
                        mean_error = summary.mean_error,
                        max_error = summary.max_error,
                        min_error = summary.min_error,
                        "weight prediction accuracy"
                    );
                }
                Ok(Aggregated {
                    daily: actual_weight_series(&records),
                    detail: DerivedDetail::WeightPrediction(WeightPredictionDetail {
                        theoretical_daily: theoretical_weight_series(&records),
                        theoretical_rolling: Vec::new(),
                        summary,
                        records,
                    }),
                })
            }
        }
    }
}

fn halted(metric: MetricId, stage: Stage, reason: HaltReason) -> AnalysisOutcome {
    AnalysisOutcome::Halted {
        metric,
        stage,
        reason,
    }
}

/// Latest first day and earliest last day of two date-sorted series.
///
/// `None` when either series is empty or their ranges do not overlap.
pub fn common_period<A: Dated, B: Dated>(a: &[A], b: &[B]) -> Option<(NaiveDate, NaiveDate)> {
    let start = a.first()?.date().max(b.first()?.date());
    let end = a.last()?.date().min(b.last()?.date());
    (start <= end).then_some((start, end))
}

/// Records whose date lies in `[start, end]`
pub fn filter_period<T: Dated + Clone>(records: &[T], start: NaiveDate, end: NaiveDate) -> Vec<T> {
    records
        .iter()
        .filter(|r| (start..=end).contains(&r.date()))
        .cloned()
        .collect()
}

fn comparison_series(analysis: &MetricAnalysis, start: NaiveDate, end: NaiveDate) -> ComparisonSeries {
    let daily = filter_period(&analysis.daily, start, end);
    let rolling = filter_period(&analysis.rolling, start, end);
    let values: Vec<f64> = daily.iter().map(|p| p.value()).collect();
    let total_change = match (values.first(), values.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };

    ComparisonSeries {
        metric: analysis.metric,
        statistics: basic_statistics(&values),
        daily,
        rolling,
        total_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemorySource;
    use chrono::Duration;
    use std::cell::RefCell;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn samples(points: &[(i64, f64)]) -> Vec<Sample> {
        points
            .iter()
            .map(|&(o, v)| Sample::new(day(o).and_hms_opt(8, 0, 0).unwrap(), Some(v), "test"))
            .collect()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            start_date: None,
            ..AnalysisConfig::default()
        }
    }

    fn days(range: std::ops::Range<i64>, value: impl Fn(i64) -> f64) -> Vec<(i64, f64)> {
        range.map(|o| (o, value(o))).collect()
    }

    fn energy_source(range: std::ops::Range<i64>) -> MemorySource {
        MemorySource::new()
            .with_file("BodyMass.csv", samples(&days(range.clone(), |o| 80.0 - o as f64 * 0.1)))
            .with_file("DietaryEnergyConsumed.csv", samples(&days(range.clone(), |_| 1800.0)))
            .with_file("BasalEnergyBurned.csv", samples(&days(range.clone(), |_| 1700.0)))
            .with_file("ActiveEnergyBurned.csv", samples(&days(range, |_| 600.0)))
    }

    #[derive(Default)]
    struct RecordingRenderer {
        metrics: RefCell<Vec<MetricId>>,
    }

    impl Renderer for RecordingRenderer {
        fn render_metric(&self, analysis: &MetricAnalysis) -> Result<Vec<PathBuf>, ComputeError> {
            self.metrics.borrow_mut().push(analysis.metric);
            Ok(vec![PathBuf::from(format!("{}.out", analysis.metric))])
        }

        fn render_comparison(&self, comparison: &Comparison) -> Result<Vec<PathBuf>, ComputeError> {
            Ok(vec![PathBuf::from(format!(
                "{}_vs_{}.out",
                comparison.primary.metric, comparison.secondary.metric
            ))])
        }
    }

    #[test]
    fn test_direct_metric_completes() {
        let source = MemorySource::new().with_file(
            "BodyMass.csv",
            samples(&days(0..10, |o| 70.0 + o as f64)),
        );
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));

        let outcome = analyzer.analyze(MetricId::BodyWeight).unwrap();
        let analysis = outcome.analysis().unwrap();

        assert_eq!(analysis.stage, Stage::Summarized);
        assert_eq!(analysis.daily.len(), 10);
        assert_eq!(analysis.rolling.len(), 10);
        assert_eq!(analysis.statistics.total_change, 9.0);
        assert_eq!(analysis.statistics.unit, "kg");
        assert_eq!(analysis.detail, DerivedDetail::None);
    }

    #[test]
    fn test_missing_file_halts_at_loaded() {
        let analyzer = HealthAnalyzer::new(config(), Box::new(MemorySource::new()));
        let outcome = analyzer.analyze(MetricId::StepCount).unwrap();

        assert_eq!(
            outcome,
            AnalysisOutcome::Halted {
                metric: MetricId::StepCount,
                stage: Stage::Loaded,
                reason: HaltReason::NoSamples,
            }
        );
    }

    #[test]
    fn test_min_data_points_gate() {
        let source = MemorySource::new().with_file("StepCount.csv", samples(&days(0..4, |_| 8000.0)));
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));

        let outcome = analyzer.analyze(MetricId::StepCount).unwrap();
        assert_eq!(
            outcome.halt_reason(),
            Some(&HaltReason::InsufficientData {
                available: 4,
                required: 5
            })
        );
    }

    #[test]
    fn test_calorie_balance_metric() {
        let analyzer = HealthAnalyzer::new(config(), Box::new(energy_source(0..8)));
        let outcome = analyzer.analyze(MetricId::CalorieBalance).unwrap();
        let analysis = outcome.analysis().unwrap();

        assert_eq!(analysis.daily.len(), 8);
        assert!(analysis.daily.iter().all(|p| p.value == -500.0));
        assert!(matches!(&analysis.detail, DerivedDetail::CalorieBalance(r) if r.len() == 8));
    }

    #[test]
    fn test_weight_prediction_metric() {
        let analyzer = HealthAnalyzer::new(config(), Box::new(energy_source(0..10)));
        let outcome = analyzer.analyze(MetricId::WeightPrediction).unwrap();
        let analysis = outcome.analysis().unwrap();

        assert_eq!(analysis.daily[0].value, 80.0);
        let detail = analysis.weight_prediction().unwrap();
        assert_eq!(detail.records.len(), 10);
        assert_eq!(detail.theoretical_rolling.len(), analysis.rolling.len());
        assert_eq!(detail.summary.as_ref().unwrap().days, 10);
    }

    #[test]
    fn test_missing_component_halts_with_name() {
        let mut source = energy_source(0..8);
        source.insert("ActiveEnergyBurned.csv", Vec::new());
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));

        let outcome = analyzer.analyze(MetricId::CalorieBalance).unwrap();
        assert_eq!(
            outcome.halt_reason(),
            Some(&HaltReason::Derivation(DerivationFailure::MissingComponents(
                vec![Component::Active]
            )))
        );
    }

    #[test]
    fn test_render_advances_stage() {
        let source = MemorySource::new().with_file("HeartRate.csv", samples(&days(0..6, |_| 60.0)));
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));
        let renderer = RecordingRenderer::default();

        let outcome = analyzer.run(MetricId::HeartRate, Some(&renderer)).unwrap();
        let analysis = outcome.analysis().unwrap();

        assert_eq!(analysis.stage, Stage::Rendered);
        assert_eq!(analysis.artifacts, vec![PathBuf::from("heart_rate.out")]);
        assert_eq!(*renderer.metrics.borrow(), vec![MetricId::HeartRate]);
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let source = MemorySource::new().with_file("HeartRate.csv", samples(&days(0..6, |_| 60.0)));
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));
        let renderer = RecordingRenderer::default();

        let entries = analyzer.analyze_batch(
            &[MetricId::StepCount, MetricId::HeartRate, MetricId::CalorieBalance],
            Some(&renderer),
        );

        assert_eq!(entries.len(), 3);
        assert!(!entries[0].succeeded());
        assert!(entries[1].succeeded());
        assert!(!entries[2].succeeded());
        assert!(matches!(
            &entries[2].result,
            Ok(AnalysisOutcome::Halted { reason: HaltReason::Derivation(_), .. })
        ));
        assert_eq!(*renderer.metrics.borrow(), vec![MetricId::HeartRate]);
    }

    #[test]
    fn test_derived_metric_without_files_names_components() {
        let analyzer = HealthAnalyzer::new(config(), Box::new(MemorySource::new()));
        let outcome = analyzer.analyze(MetricId::CalorieBalance).unwrap();

        assert_eq!(
            outcome.halt_reason(),
            Some(&HaltReason::Derivation(DerivationFailure::MissingComponents(vec![
                Component::Intake,
                Component::Basal,
                Component::Active,
            ])))
        );
    }

    #[test]
    fn test_comparison_uses_common_period() {
        let source = MemorySource::new()
            .with_file("BodyMass.csv", samples(&days(0..20, |_| 75.0)))
            .with_file(
                "DietaryEnergyConsumed.csv",
                samples(&days(10..30, |o| 2000.0 + o as f64)),
            );
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));

        let outcome = analyzer
            .compare(MetricId::BodyWeight, MetricId::CalorieIntake)
            .unwrap();
        let comparison = outcome.comparison().unwrap();

        assert_eq!(comparison.start_date, day(10));
        assert_eq!(comparison.end_date, day(19));
        assert_eq!(comparison.primary.daily.len(), 10);
        assert_eq!(comparison.secondary.daily.len(), 10);
        assert_eq!(comparison.secondary.total_change, 9.0);
        assert!(comparison
            .primary
            .rolling
            .iter()
            .all(|p| p.date >= day(10) && p.date <= day(19)));

        let renderer = RecordingRenderer::default();
        let rendered = analyzer
            .render_comparison(outcome, &renderer)
            .unwrap();
        assert_eq!(
            rendered.comparison().unwrap().artifacts,
            vec![PathBuf::from("body_weight_vs_calorie_intake.out")]
        );
    }

    #[test]
    fn test_comparison_without_overlap_is_abandoned() {
        let source = MemorySource::new()
            .with_file("BodyMass.csv", samples(&days(0..10, |_| 75.0)))
            .with_file("DietaryEnergyConsumed.csv", samples(&days(20..30, |_| 2000.0)));
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));

        let outcome = analyzer
            .compare(MetricId::BodyWeight, MetricId::CalorieIntake)
            .unwrap();
        assert_eq!(
            outcome,
            ComparisonOutcome::Abandoned {
                metric: None,
                reason: HaltReason::NoCommonPeriod
            }
        );
    }

    #[test]
    fn test_comparison_reports_halted_metric() {
        let source = MemorySource::new().with_file("BodyMass.csv", samples(&days(0..10, |_| 75.0)));
        let analyzer = HealthAnalyzer::new(config(), Box::new(source));

        let outcome = analyzer
            .compare(MetricId::BodyWeight, MetricId::CalorieIntake)
            .unwrap();
        assert!(matches!(
            outcome,
            ComparisonOutcome::Abandoned {
                metric: Some(MetricId::CalorieIntake),
                reason: HaltReason::NoSamples
            }
        ));
    }

    #[test]
    fn test_config_window_filters_samples() {
        let source = MemorySource::new().with_file("BodyMass.csv", samples(&days(0..30, |_| 75.0)));
        let config = AnalysisConfig {
            start_date: Some(day(10)),
            end_date: Some(day(19)),
            ..AnalysisConfig::default()
        };
        let analyzer = HealthAnalyzer::new(config, Box::new(source));

        let outcome = analyzer.analyze(MetricId::BodyWeight).unwrap();
        let stats = &outcome.analysis().unwrap().statistics;
        assert_eq!(stats.start_date, day(10));
        assert_eq!(stats.end_date, day(19));
        assert_eq!(stats.data_days, 10);
    }

    #[test]
    fn test_common_period() {
        let a = vec![DailyPoint::new(day(0), 1.0, 1), DailyPoint::new(day(5), 1.0, 1)];
        let b = vec![DailyPoint::new(day(3), 1.0, 1), DailyPoint::new(day(9), 1.0, 1)];
        assert_eq!(common_period(&a, &b), Some((day(3), day(5))));
        assert_eq!(common_period::<DailyPoint, DailyPoint>(&a, &[]), None);
    }
}
