//! JSON report encoding
//!
//! This module encodes analyses and comparisons into self-describing JSON
//! reports and writes them next to the charts in the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ComputeError;
use crate::pipeline::{Comparison, MetricAnalysis, Renderer};
use crate::types::{Dated, Segment};
use crate::{PRODUCER_NAME, VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Who produced a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Bounds of one connected run of data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSpan {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: usize,
}

/// Report for one metric
#[derive(Debug, Serialize)]
pub struct MetricReport<'a> {
    pub report_version: &'static str,
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub display_name: &'static str,
    pub title: &'static str,
    pub segments: Vec<SegmentSpan>,
    pub rolling_segments: Vec<SegmentSpan>,
    pub analysis: &'a MetricAnalysis,
}

/// Report for a two-metric comparison
#[derive(Debug, Serialize)]
pub struct ComparisonReport<'a> {
    pub report_version: &'static str,
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub comparison: &'a Comparison,
}

/// Encoder producing report payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode_metric<'a>(&self, analysis: &'a MetricAnalysis) -> MetricReport<'a> {
        let config = analysis.config();
        MetricReport {
            report_version: REPORT_VERSION,
            producer: self.producer(),
            generated_at_utc: Utc::now().to_rfc3339(),
            display_name: config.display_name,
            title: config.title,
            segments: spans(&analysis.daily_segments()),
            rolling_segments: spans(&analysis.rolling_segments()),
            analysis,
        }
    }

    pub fn encode_comparison<'a>(&self, comparison: &'a Comparison) -> ComparisonReport<'a> {
        ComparisonReport {
            report_version: REPORT_VERSION,
            producer: self.producer(),
            generated_at_utc: Utc::now().to_rfc3339(),
            comparison,
        }
    }

    /// Encode one metric to a JSON string
    pub fn metric_to_json(&self, analysis: &MetricAnalysis) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.encode_metric(analysis)).map_err(ComputeError::JsonError)
    }

    /// Encode a comparison to a JSON string
    pub fn comparison_to_json(&self, comparison: &Comparison) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.encode_comparison(comparison))
            .map_err(ComputeError::JsonError)
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}

fn spans<T: Dated>(segments: &[Segment<T>]) -> Vec<SegmentSpan> {
    segments
        .iter()
        .filter_map(|segment| {
            Some(SegmentSpan {
                start_date: segment.first()?.date(),
                end_date: segment.last()?.date(),
                points: segment.len(),
            })
        })
        .collect()
}

/// Today's date as used in artifact file names
pub fn today_tag() -> String {
    Local::now().format("%Y%m%d").to_string()
}

/// `<dir>/<stem>_<tag>.<extension>`
pub fn artifact_path(dir: &Path, stem: &str, date_tag: &str, extension: &str) -> PathBuf {
    dir.join(format!("{stem}_{date_tag}.{extension}"))
}

/// Renderer writing JSON reports
pub struct JsonReportRenderer {
    encoder: ReportEncoder,
    output_dir: PathBuf,
    date_tag: String,
}

impl JsonReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder: ReportEncoder::new(),
            output_dir: output_dir.into(),
            date_tag: today_tag(),
        }
    }

    /// Use a fixed date tag in file names instead of today's date
    pub fn with_date_tag(mut self, date_tag: impl Into<String>) -> Self {
        self.date_tag = date_tag.into();
        self
    }

    pub fn with_encoder(mut self, encoder: ReportEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    fn write(&self, stem: &str, json: String) -> Result<PathBuf, ComputeError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = artifact_path(&self.output_dir, stem, &self.date_tag, "json");
        fs::write(&path, json)?;
        debug!(path = %path.display(), "wrote report");
        Ok(path)
    }
}

impl Renderer for JsonReportRenderer {
    fn render_metric(&self, analysis: &MetricAnalysis) -> Result<Vec<PathBuf>, ComputeError> {
        let json = self.encoder.metric_to_json(analysis)?;
        Ok(vec![self.write(analysis.metric.as_str(), json)?])
    }

    fn render_comparison(&self, comparison: &Comparison) -> Result<Vec<PathBuf>, ComputeError> {
        let json = self.encoder.comparison_to_json(comparison)?;
        let stem = format!(
            "{}_vs_{}",
            comparison.primary.metric.as_str(),
            comparison.secondary.metric.as_str()
        );
        Ok(vec![self.write(&stem, json)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemorySource;
    use crate::config::AnalysisConfig;
    use crate::pipeline::HealthAnalyzer;
    use crate::registry::MetricId;
    use crate::types::Sample;
    use chrono::Duration;

    fn analysis() -> MetricAnalysis {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let offsets = [0, 1, 2, 3, 50, 51, 52];
        let samples = offsets
            .iter()
            .map(|&o| {
                let ts = (base + Duration::days(o)).and_hms_opt(7, 0, 0).unwrap();
                Sample::new(ts, Some(70.0 + o as f64 * 0.01), "scale")
            })
            .collect();
        let source = MemorySource::new().with_file("BodyMass.csv", samples);
        let analyzer = HealthAnalyzer::new(AnalysisConfig::default(), Box::new(source));
        analyzer
            .analyze(MetricId::BodyWeight)
            .unwrap()
            .analysis()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_encode_metric() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let analysis = analysis();
        let report = encoder.encode_metric(&analysis);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.segments[0].points, 4);
    }

    #[test]
    fn test_json_contains_statistics() {
        let encoder = ReportEncoder::new();
        let json = encoder.metric_to_json(&analysis()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["analysis"]["metric"], "body_weight");
        assert_eq!(value["analysis"]["statistics"]["count"], 7);
        assert_eq!(value["analysis"]["statistics"]["unit"], "kg");
        assert_eq!(value["analysis"]["detail"]["kind"], "none");
    }

    #[test]
    fn test_renderer_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = JsonReportRenderer::new(dir.path().join("out")).with_date_tag("20240401");

        let written = renderer.render_metric(&analysis()).unwrap();

        assert_eq!(written, vec![dir.path().join("out").join("body_weight_20240401.json")]);
        let contents = std::fs::read_to_string(&written[0]).unwrap();
        assert!(contents.contains("\"report_version\""));
    }

    #[test]
    fn test_unique_instance_ids() {
        assert_ne!(ReportEncoder::new().instance_id(), ReportEncoder::new().instance_id());
    }
}
