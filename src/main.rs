//! # Load Test Analysis Entry Point
//!
//! Reads the finished logs of one load-test run and produces:
//! - `data/results/loadtest_report.png`: concurrency / P95 latency / CPU chart.
//! - Console summary box with min/avg/max statistics and capacity guidance.
//! - Optional per-bucket CSV (`--csv`).
//!
//! Exit status is non-zero only when the event log is unavailable or an output cannot be written.

use std::error::Error;

use clap::Parser;
use env_logger::Env;
use log::info;

use loadtest_analysis::{
    config::{AnalysisConfig, Args},
    pipeline,
    report::console::{render_guidance, render_summary},
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AnalysisConfig::try_from(Args::parse())?;
    info!("=== LOAD TEST ANALYSIS START ===");

    let report = pipeline::run(&config)?;

    println!();
    print!("{}", render_summary(&report.summary));
    println!();
    print!(
        "{}",
        render_guidance(&report.summary, config.prod_cores, report.local_cores)
    );

    if let Some(chart) = &config.chart {
        println!("\nChart generated: {}", chart.display());
    }
    if let Some(csv) = &config.csv {
        println!("Bucket series exported: {}", csv.display());
    }

    info!("=== LOAD TEST ANALYSIS FINISHED ===");
    Ok(())
}
