//! One analysis run: ingest → align → summarize → render/export.
//!
//! Single-threaded and single-pass over finished log files. Only the event log is
//! mandatory; everything else degrades to an omitted series or caption.

use log::{info, warn};

use crate::{
    analysis::{
        bucketing::AlignedSeries,
        summary::{AggregateStats, summarize},
    },
    config::AnalysisConfig,
    error::Result,
    ingest::{
        environment::{EnvironmentMetadata, load_environment},
        events::{ParseStats, parse_event_log},
        resources::load_resource_samples,
    },
    report::{chart::render_chart, export::export_series_csv},
};

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub series: AlignedSeries,
    pub summary: AggregateStats,
    pub environment: Option<EnvironmentMetadata>,
    pub event_stats: ParseStats,
    pub cpu_samples: usize,
    /// Logical cores of the test machine: configured, recorded in metadata, or detected.
    pub local_cores: f64,
}

pub fn run(config: &AnalysisConfig) -> Result<AnalysisReport> {
    let events = parse_event_log(&config.events, config.bucket_width_ms)?;
    let resources = load_resource_samples(&config.resources, config.bucket_width_ms);
    let environment = load_environment(&config.environment);

    if events.latency.is_empty() {
        warn!("No latency points found in {:?}; latency series will be empty", config.events);
    }

    let series = AlignedSeries::align(&events.latency, &events.concurrency, &resources.cpu);
    let summary = summarize(&series, &resources.raw_cpu);
    info!(
        "Aligned {} buckets of {} ms (CPU data: {})",
        series.len(),
        series.width_ms,
        if summary.has_cpu() { "yes" } else { "no" }
    );

    if let Some(path) = &config.chart {
        render_chart(path, &series, environment.as_ref(), config.canvas)?;
    }
    if let Some(path) = &config.csv {
        export_series_csv(path, &series)?;
    }

    let local_cores = config
        .local_cores
        .or_else(|| environment.as_ref().and_then(EnvironmentMetadata::host_cpus))
        .unwrap_or_else(|| num_cpus::get() as f64);

    Ok(AnalysisReport {
        series,
        summary,
        environment,
        event_stats: events.stats,
        cpu_samples: resources.raw_cpu.len(),
        local_cores,
    })
}
