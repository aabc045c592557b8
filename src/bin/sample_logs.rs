//! Writes a synthetic run (metric log, resource samples, environment document) for smoke tests.
//!
//! VUs ramp linearly to `--max-vus`; latency stays flat until the saturation point and then
//! grows with load, CPU tracks VUs up to the container limit. Noise via `rand`.

use std::{
    error::Error,
    fs::{File, create_dir_all},
    io::{BufWriter, Write},
    path::PathBuf,
};

use chrono::{Duration, SecondsFormat, Utc};
use clap::Parser;
use log::info;
use rand::random_range;
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "sample_logs", about = "Generate a synthetic load-test run")]
struct Cli {
    /// Output directory for k6_results.json, docker_stats.jsonl and environment.json.
    #[arg(long, default_value = "data/logs")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 300)]
    duration_secs: u32,

    #[arg(long, default_value_t = 200)]
    max_vus: u32,

    /// VU count where the synthetic service saturates.
    #[arg(long, default_value_t = 120)]
    saturation_vus: u32,

    /// Container CPU limit in cores.
    #[arg(long, default_value_t = 2.0)]
    cpu_limit: f64,

    /// Omit the resource sample log.
    #[arg(long)]
    no_resources: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    create_dir_all(&cli.out_dir)?;

    let start = Utc::now();
    let mut events = BufWriter::new(File::create(cli.out_dir.join("k6_results.json"))?);
    let mut resources = if cli.no_resources {
        None
    } else {
        Some(BufWriter::new(File::create(cli.out_dir.join("docker_stats.jsonl"))?))
    };

    writeln!(
        events,
        "{}",
        json!({"type": "Metric", "metric": "http_req_duration", "data": {"type": "trend", "contains": "time"}})
    )?;

    let mut points = 0u64;
    for sec in 0..cli.duration_secs {
        let vus = (cli.max_vus as f64 * (sec + 1) as f64 / cli.duration_secs as f64).ceil();
        let ts = start + Duration::seconds(sec as i64);
        let time = ts.to_rfc3339_opts(SecondsFormat::Millis, true);

        writeln!(
            events,
            "{}",
            json!({"type": "Point", "metric": "vus", "data": {"time": time, "value": vus, "tags": {}}})
        )?;

        let overload = (vus - cli.saturation_vus as f64).max(0.0);
        let base_ms = 40.0 + overload * 6.0;
        for i in 0..(vus as u32).min(50) {
            let at = ts + Duration::milliseconds(i as i64 * 20);
            let latency = base_ms * random_range(0.7..1.6);
            writeln!(
                events,
                "{}",
                json!({
                    "type": "Point",
                    "metric": "http_req_duration",
                    "data": {
                        "time": at.to_rfc3339_opts(SecondsFormat::Millis, true),
                        "value": latency,
                        "tags": {"method": "GET", "status": "200"}
                    }
                })
            )?;
            points += 1;
        }

        if let Some(out) = resources.as_mut().filter(|_| sec % 2 == 0) {
            let cap = cli.cpu_limit * 100.0;
            let cpu = (vus / cli.saturation_vus as f64 * cap * random_range(0.85..1.1)).min(cap);
            writeln!(out, "{}", json!({"time": time, "cpu": format!("{:.2}%", cpu)}))?;
        }
    }
    events.flush()?;
    if let Some(mut out) = resources {
        out.flush()?;
    }

    let env = json!({
        "host": {"os": std::env::consts::OS, "arch": std::env::consts::ARCH, "cpus": num_cpus::get()},
        "container": {"name": "synthetic-api", "image": "example/api:latest", "cpuLimit": cli.cpu_limit},
        "versions": {"sample_logs": env!("CARGO_PKG_VERSION")},
        "testDateLocal": start.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    });
    std::fs::write(cli.out_dir.join("environment.json"), serde_json::to_string_pretty(&env)?)?;

    info!("Wrote {} latency points over {} s to {:?}", points, cli.duration_secs, cli.out_dir);
    println!("Synthetic run written to {}", cli.out_dir.display());
    Ok(())
}
