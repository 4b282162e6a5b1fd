//! health-trends - Long-term trend analysis of personal health exports
//!
//! health-trends turns raw per-sample health records into daily series through
//! a deterministic pipeline: sample loading → daily aggregation → derived
//! energy metrics → rolling averages → statistics → rendering.
//!
//! ## Modules
//!
//! - **Direct metrics**: one export file reduced per calendar day (weight, steps, ...)
//! - **Derived metrics**: calorie balance and the energy-balance weight prediction
//! - **Comparisons**: two metrics on a shared period and a dual-axis chart

pub mod adapters;
pub mod aggregator;
#[cfg(feature = "charts")]
pub mod chart;
pub mod config;
pub mod derived;
pub mod encoder;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod registry;
pub mod rolling;
pub mod segments;
pub mod statistics;
pub mod types;

pub use adapters::{CsvDirectorySource, MemorySource, SampleSource};
pub use config::{AnalysisConfig, DateWindow};
pub use error::ComputeError;
pub use pipeline::{
    AnalysisOutcome, BatchEntry, ComparisonOutcome, HaltReason, HealthAnalyzer, MetricAnalysis,
    Renderer, RendererSet, Stage,
};
pub use registry::{Category, MetricConfig, MetricId};

#[cfg(feature = "charts")]
pub use chart::ChartRenderer;
pub use encoder::JsonReportRenderer;

/// Crate version embedded in every report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "health-trends";
