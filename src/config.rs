//! Run configuration: defaults as constants, overridable from the command line or environment.

use std::path::PathBuf;

use clap::Parser;

use crate::{
    analysis::bucketing::DEFAULT_BUCKET_WIDTH_MS,
    error::{AnalysisError, Result},
    report::chart::CANVAS_SIZE,
};

pub const DEFAULT_EVENT_LOG: &str = "data/logs/k6_results.json";
pub const DEFAULT_RESOURCE_LOG: &str = "data/logs/docker_stats.jsonl";
pub const DEFAULT_ENVIRONMENT: &str = "data/logs/environment.json";
pub const DEFAULT_CHART: &str = "data/results/loadtest_report.png";

/// Offline analysis of a finished load test: latency, concurrency and container CPU.
#[derive(Debug, Clone, Parser)]
#[command(name = "analyze", version, about)]
pub struct Args {
    /// NDJSON metric log written by the load generator (required input).
    #[arg(long, env = "LOADTEST_EVENTS", default_value = DEFAULT_EVENT_LOG)]
    pub events: PathBuf,

    /// NDJSON resource samples of the target container (optional input).
    #[arg(long, env = "LOADTEST_RESOURCES", default_value = DEFAULT_RESOURCE_LOG)]
    pub resources: PathBuf,

    /// Environment metadata JSON document (optional input).
    #[arg(long, env = "LOADTEST_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: PathBuf,

    /// Chart output; `.svg` writes SVG, anything else PNG.
    #[arg(long, env = "LOADTEST_CHART", default_value = DEFAULT_CHART)]
    pub chart: PathBuf,

    /// Skip chart rendering.
    #[arg(long)]
    pub no_chart: bool,

    /// Also export the per-bucket series as CSV.
    #[arg(long, env = "LOADTEST_CSV")]
    pub csv: Option<PathBuf>,

    /// Bucket width in seconds.
    #[arg(long, default_value_t = (DEFAULT_BUCKET_WIDTH_MS / 1000) as u64)]
    pub bucket_secs: u64,

    /// Logical cores available in production; enables the concrete capacity estimate.
    #[arg(long)]
    pub prod_cores: Option<f64>,

    /// Logical cores of the test machine (default: environment metadata, then detected).
    #[arg(long)]
    pub local_cores: Option<f64>,
}

/// Plain settings consumed by the library.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub events: PathBuf,
    pub resources: PathBuf,
    pub environment: PathBuf,
    pub chart: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub bucket_width_ms: i64,
    pub canvas: (u32, u32),
    pub prod_cores: Option<f64>,
    pub local_cores: Option<f64>,
}

impl AnalysisConfig {
    /// Given inputs with default bucket width and canvas; no chart or CSV output.
    pub fn with_inputs(events: PathBuf, resources: PathBuf, environment: PathBuf) -> Self {
        Self {
            events,
            resources,
            environment,
            chart: None,
            csv: None,
            bucket_width_ms: DEFAULT_BUCKET_WIDTH_MS,
            canvas: CANVAS_SIZE,
            prod_cores: None,
            local_cores: None,
        }
    }
}

impl TryFrom<Args> for AnalysisConfig {
    type Error = AnalysisError;

    fn try_from(args: Args) -> Result<Self> {
        if args.bucket_secs == 0 {
            return Err(AnalysisError::Config("--bucket-secs must be greater than 0".into()));
        }
        let bucket_width_ms = i64::try_from(args.bucket_secs)
            .ok()
            .and_then(|s| s.checked_mul(1000))
            .ok_or_else(|| AnalysisError::Config("--bucket-secs is too large".into()))?;

        for (flag, cores) in [("--prod-cores", args.prod_cores), ("--local-cores", args.local_cores)] {
            if cores.is_some_and(|c| !(c > 0.0)) {
                return Err(AnalysisError::Config(format!("{} must be positive", flag)));
            }
        }

        Ok(Self {
            events: args.events,
            resources: args.resources,
            environment: args.environment,
            chart: (!args.no_chart).then_some(args.chart),
            csv: args.csv,
            bucket_width_ms,
            canvas: CANVAS_SIZE,
            prod_cores: args.prod_cores,
            local_cores: args.local_cores,
        })
    }
}
