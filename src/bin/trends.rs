//! Trends CLI - Command-line interface for health-trends
//!
//! Commands:
//! - analyze: Analyze one or more metrics (statistics, charts, reports)
//! - compare: Compare two metrics over their common period
//! - list: List available metrics
//! - doctor: Diagnose the data directory and metric availability

use chrono::{Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use health_trends::adapters::{CsvDirectorySource, SampleSource};
use health_trends::format::{comparison_report, statistics_report};
use health_trends::registry::{all_metrics, metrics_in};
use health_trends::{
    AnalysisConfig, AnalysisOutcome, Category, ChartRenderer, ComparisonOutcome, ComputeError,
    HealthAnalyzer, JsonReportRenderer, MetricId, Renderer, RendererSet, PRODUCER_NAME, VERSION,
};

/// Trends - Long-term trend analysis of exported health data
#[derive(Parser)]
#[command(name = "trends")]
#[command(version = VERSION)]
#[command(about = "Analyze daily trends in exported health metrics", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more metrics
    Analyze {
        /// Metrics to analyze (comma separated)
        #[arg(short = 't', long = "data-type", value_delimiter = ',', default_value = "body_weight")]
        data_types: Vec<String>,

        #[command(flatten)]
        options: AnalysisOptions,
    },

    /// Compare two metrics over the period both have data for
    Compare {
        /// Metric on the left axis
        #[arg(default_value = "body_weight")]
        primary: String,

        /// Metric on the right axis
        #[arg(default_value = "calorie_intake")]
        secondary: String,

        #[command(flatten)]
        options: AnalysisOptions,
    },

    /// List available metrics
    List {
        /// Group metrics by category
        #[arg(long)]
        categories: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose the data directory and metric availability
    Doctor {
        /// Directory holding the exported CSV files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone)]
struct AnalysisOptions {
    /// First day to analyze (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last day to analyze (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Analyze the last N days (overrides --start-date)
    #[arg(long)]
    days: Option<i64>,

    /// Rolling average window in days
    #[arg(long)]
    rolling_window: Option<usize>,

    /// Gap in days above which trend lines are broken
    #[arg(long)]
    gap_threshold: Option<i64>,

    /// Minimum number of days with data
    #[arg(long)]
    min_data_points: Option<usize>,

    /// Energy density used by the weight prediction (kcal per kg)
    #[arg(long)]
    kcal_per_kg: Option<f64>,

    /// Directory holding the exported CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory receiving charts and reports
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Load settings from a JSON file (flags take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not draw charts
    #[arg(long)]
    no_graph: bool,

    /// Do not write any files
    #[arg(long)]
    no_save: bool,

    /// Do not print statistics
    #[arg(long)]
    no_statistics: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TrendsCliError> {
    match cli.command {
        Commands::Analyze { data_types, options } => cmd_analyze(&data_types, &options),
        Commands::Compare {
            primary,
            secondary,
            options,
        } => cmd_compare(&primary, &secondary, &options),
        Commands::List { categories, json } => cmd_list(categories, json),
        Commands::Doctor { data_dir, json } => cmd_doctor(data_dir, json),
    }
}

fn build_config(options: &AnalysisOptions) -> Result<AnalysisConfig, TrendsCliError> {
    let mut config = match &options.config {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };

    if let Some(start) = options.start_date {
        config.start_date = Some(start);
    }
    if let Some(end) = options.end_date {
        config.end_date = Some(end);
    }
    if let Some(days) = options.days {
        if days < 0 {
            return Err(TrendsCliError::InvalidArgument(format!(
                "--days must not be negative, got {}",
                days
            )));
        }
        config.start_date = Some(Local::now().date_naive() - Duration::days(days));
    }
    if let Some(window) = options.rolling_window {
        config.rolling_window = Some(window);
    }
    if let Some(gap) = options.gap_threshold {
        config.gap_threshold_days = gap;
    }
    if let Some(min) = options.min_data_points {
        config.min_data_points = min;
    }
    if let Some(kcal) = options.kcal_per_kg {
        config.kcal_per_kg = kcal;
    }
    if let Some(dir) = &options.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &options.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn build_renderers(options: &AnalysisOptions, output_dir: &Path) -> RendererSet {
    let mut renderers = RendererSet::new();
    if options.no_save {
        return renderers;
    }
    renderers.push(Box::new(JsonReportRenderer::new(output_dir)));
    if !options.no_graph {
        renderers.push(Box::new(ChartRenderer::new(output_dir)));
    }
    renderers
}

fn parse_metrics(names: &[String]) -> Result<Vec<MetricId>, TrendsCliError> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<MetricId>().map_err(TrendsCliError::from))
        .collect()
}

fn cmd_analyze(data_types: &[String], options: &AnalysisOptions) -> Result<(), TrendsCliError> {
    let metrics = parse_metrics(data_types)?;
    if metrics.is_empty() {
        return Err(TrendsCliError::InvalidArgument(
            "no metric given to --data-type".to_string(),
        ));
    }

    let config = build_config(options)?;
    let renderers = build_renderers(options, &config.output_dir);
    let analyzer = HealthAnalyzer::with_data_dir(config);

    let renderer: Option<&dyn Renderer> = if renderers.is_empty() {
        None
    } else {
        Some(&renderers)
    };
    let entries = analyzer.analyze_batch(&metrics, renderer);

    if options.json {
        let results: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| match &entry.result {
                Ok(outcome) => serde_json::to_value(outcome)
                    .unwrap_or_else(|e| error_value(entry.metric, &e.to_string())),
                Err(e) => error_value(entry.metric, &e.to_string()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for entry in &entries {
            match &entry.result {
                Ok(AnalysisOutcome::Completed(analysis)) => {
                    if !options.no_statistics {
                        println!("{}", statistics_report(analysis));
                    }
                    for path in &analysis.artifacts {
                        println!("Saved: {}", path.display());
                    }
                }
                Ok(AnalysisOutcome::Halted { metric, reason, .. }) => {
                    println!("Skipped {}: {}", metric, reason);
                }
                Err(e) => println!("Failed {}: {}", entry.metric, e),
            }
        }
    }

    let succeeded = entries.iter().filter(|e| e.succeeded()).count();
    if !options.json {
        println!("Completed {}/{} analyses", succeeded, entries.len());
    }
    if succeeded < entries.len() {
        return Err(TrendsCliError::AnalysisFailed {
            failed: entries.len() - succeeded,
            total: entries.len(),
        });
    }
    Ok(())
}

fn error_value(metric: MetricId, message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "metric": metric,
        "message": message,
    })
}

fn cmd_compare(
    primary: &str,
    secondary: &str,
    options: &AnalysisOptions,
) -> Result<(), TrendsCliError> {
    let primary: MetricId = primary.parse()?;
    let secondary: MetricId = secondary.parse()?;

    let config = build_config(options)?;
    let renderers = build_renderers(options, &config.output_dir);
    let analyzer = HealthAnalyzer::with_data_dir(config);

    let mut outcome = analyzer.compare(primary, secondary)?;
    if !renderers.is_empty() {
        outcome = analyzer.render_comparison(outcome, &renderers)?;
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        ComparisonOutcome::Completed(comparison) => {
            if !options.json {
                if !options.no_statistics {
                    println!("{}", comparison_report(&comparison));
                }
                for path in &comparison.artifacts {
                    println!("Saved: {}", path.display());
                }
            }
            Ok(())
        }
        ComparisonOutcome::Abandoned { metric, reason } => {
            let message = match metric {
                Some(metric) => format!("{}: {}", metric, reason),
                None => reason.to_string(),
            };
            Err(TrendsCliError::ComparisonAbandoned(message))
        }
    }
}

fn cmd_list(categories: bool, json: bool) -> Result<(), TrendsCliError> {
    let entries: Vec<MetricListing> = all_metrics()
        .iter()
        .map(|config| MetricListing {
            id: config.id,
            name: config.display_name,
            unit: config.unit,
            category: config.category,
            description: config.description,
            files: config.required_files(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if categories {
        for category in Category::ALL {
            println!("{}", category.label());
            for config in metrics_in(category) {
                println!("  {:<18} {}", config.id.as_str(), config.display_name);
            }
            println!();
        }
    } else {
        println!("Available metrics");
        println!("=================");
        for entry in &entries {
            let unit = if entry.unit.is_empty() { "-" } else { entry.unit };
            println!("  {:<18} {:<18} [{}] {}", entry.id.as_str(), entry.name, unit, entry.description);
        }
    }

    Ok(())
}

fn cmd_doctor(data_dir: Option<PathBuf>, json: bool) -> Result<(), TrendsCliError> {
    let data_dir = data_dir.unwrap_or_else(|| AnalysisConfig::default().data_dir);
    let mut checks = Vec::new();

    if data_dir.is_dir() {
        checks.push(DoctorCheck {
            name: "data_dir".to_string(),
            status: CheckStatus::Ok,
            message: format!("Data directory found: {}", data_dir.display()),
        });

        let source = CsvDirectorySource::new(&data_dir);
        for config in all_metrics() {
            let missing: Vec<&str> = config
                .required_files()
                .into_iter()
                .filter(|file| !source.exists(file))
                .collect();
            checks.push(if missing.is_empty() {
                DoctorCheck {
                    name: config.id.as_str().to_string(),
                    status: CheckStatus::Ok,
                    message: "All input files present".to_string(),
                }
            } else {
                DoctorCheck {
                    name: config.id.as_str().to_string(),
                    status: CheckStatus::Warning,
                    message: format!("Missing: {}", missing.join(", ")),
                }
            });
        }
    } else {
        checks.push(DoctorCheck {
            name: "data_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("Data directory does not exist: {}", data_dir.display()),
        });
    }

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a TTY (text reports)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a pipe (use --json for machine-readable output)".to_string(),
        }
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Trends Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TrendsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum TrendsCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidArgument(String),
    AnalysisFailed { failed: usize, total: usize },
    ComparisonAbandoned(String),
    DoctorFailed,
}

impl From<io::Error> for TrendsCliError {
    fn from(e: io::Error) -> Self {
        TrendsCliError::Io(e)
    }
}

impl From<ComputeError> for TrendsCliError {
    fn from(e: ComputeError) -> Self {
        TrendsCliError::Compute(e)
    }
}

impl From<serde_json::Error> for TrendsCliError {
    fn from(e: serde_json::Error) -> Self {
        TrendsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrendsCliError> for CliError {
    fn from(e: TrendsCliError) -> Self {
        match e {
            TrendsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TrendsCliError::Compute(ComputeError::UnknownMetric(name)) => CliError {
                code: "UNKNOWN_METRIC".to_string(),
                message: format!("Unknown metric: {}", name),
                hint: Some("Run 'trends list' to see available metrics".to_string()),
            },
            TrendsCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Check the configuration file and flags".to_string()),
            },
            TrendsCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'trends doctor' to check the data directory".to_string()),
            },
            TrendsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TrendsCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run 'trends --help' for usage".to_string()),
            },
            TrendsCliError::AnalysisFailed { failed, total } => CliError {
                code: "ANALYSIS_FAILED".to_string(),
                message: format!("{} of {} analyses did not complete", failed, total),
                hint: Some("Run with --verbose for details".to_string()),
            },
            TrendsCliError::ComparisonAbandoned(msg) => CliError {
                code: "COMPARISON_ABANDONED".to_string(),
                message: msg,
                hint: Some("Choose metrics whose data overlap in time".to_string()),
            },
            TrendsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct MetricListing {
    id: MetricId,
    name: &'static str,
    unit: &'static str,
    category: Category,
    description: &'static str,
    files: Vec<&'static str>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
