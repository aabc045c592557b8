//! Resource sample loader: periodic container CPU snapshots, one JSON object per line.
//!
//! `{"time":"2024-05-01T10:00:00Z","cpu":"187.42%"}`. CPU is unbounded above 100;
//! each 100% is one saturated logical core.
//!
//! The file is optional. Missing or unreadable → empty result, the report simply omits CPU.
//! Lines are split on raw bytes so one corrupt line never discards the rest of the file.

use std::{fs, path::Path};

use chrono::{DateTime, FixedOffset};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::analysis::bucketing::SeriesBuckets;

#[derive(Debug, Deserialize)]
struct RawSample {
    time: DateTime<FixedOffset>,
    cpu: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub timestamp_ms: i64,
    pub cpu_percent: f64,
}

/// `"187.42%"` → `187.42`. Rejects negative and non-finite values.
pub fn parse_cpu_percent(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    let value: f64 = number.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// One NDJSON line as raw bytes; invalid UTF-8 fails like any other bad JSON.
pub fn parse_sample_line(line: &[u8]) -> Option<ResourceSample> {
    let raw: RawSample = serde_json::from_slice(line).ok()?;
    Some(ResourceSample {
        timestamp_ms: raw.time.timestamp_millis(),
        cpu_percent: parse_cpu_percent(&raw.cpu)?,
    })
}

/// CPU percentages both bucketed and as the flat, ordered raw sequence.
#[derive(Debug, Clone)]
pub struct ResourceSamples {
    pub cpu: SeriesBuckets,
    pub raw_cpu: Vec<f64>,
    pub malformed: usize,
}

impl ResourceSamples {
    pub fn empty(width_ms: i64) -> Self {
        Self {
            cpu: SeriesBuckets::new(width_ms),
            raw_cpu: Vec::new(),
            malformed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_cpu.is_empty()
    }
}

pub fn samples_from_bytes(bytes: &[u8], width_ms: i64) -> ResourceSamples {
    let mut out = ResourceSamples::empty(width_ms);

    for (n, line) in bytes.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match parse_sample_line(line) {
            Some(sample) => {
                out.cpu.push(sample.timestamp_ms, sample.cpu_percent);
                out.raw_cpu.push(sample.cpu_percent);
            }
            None => {
                out.malformed += 1;
                debug!("resource log: skipping malformed line {}", n + 1);
            }
        }
    }
    out
}

/// Loads the whole (small) resource log; never fails.
pub fn load_resource_samples(path: &Path, width_ms: i64) -> ResourceSamples {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("Resource log {:?} unavailable ({}); continuing without CPU data", path, e);
            return ResourceSamples::empty(width_ms);
        }
    };

    let samples = samples_from_bytes(&bytes, width_ms);
    info!(
        "resource log: {} CPU samples in {} buckets, {} malformed lines",
        samples.raw_cpu.len(),
        samples.cpu.bucket_count(),
        samples.malformed
    );
    samples
}
