//! CSV export of the aligned bucket series, one row per bucket.
//!
//! Absent values are written as empty cells so "no data" never reads as 0.

use std::path::Path;

use csv::Writer;
use log::info;
use serde::Serialize;

use crate::{
    analysis::bucketing::AlignedSeries,
    error::Result,
    report::{chart::format_clock, ensure_parent_dir},
};

#[derive(Debug, Serialize)]
struct CsvRow {
    bucket_start_ms: i64,
    bucket_start_local: String,
    p95_latency_ms: Option<f64>,
    max_concurrency: Option<f64>,
    max_cpu_percent: Option<f64>,
}

pub fn write_series_csv<W: std::io::Write>(writer: W, series: &AlignedSeries) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in series.rows() {
        wtr.serialize(CsvRow {
            bucket_start_ms: row.start_ms,
            bucket_start_local: format_clock(row.start_ms),
            p95_latency_ms: row.latency_p95,
            max_concurrency: row.concurrency_max,
            max_cpu_percent: row.cpu_max,
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn export_series_csv(path: &Path, series: &AlignedSeries) -> Result<()> {
    ensure_parent_dir(path)?;
    let wtr = std::fs::File::create(path).map_err(csv::Error::from)?;
    write_series_csv(wtr, series)?;
    info!("Bucket series exported to {:?} ({} rows)", path, series.len());
    Ok(())
}
