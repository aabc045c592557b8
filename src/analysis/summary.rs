//! Global statistics over a whole run plus inflection-point detection.
//!
//! Latency and concurrency stats are taken over the per-bucket series. CPU stats are
//! taken over the raw, unbucketed samples: the mean of per-bucket maxima overstates
//! typical load, while the raw max still captures true peaks.

use crate::analysis::bucketing::{AlignedSeries, BucketIndex};

/// P95 must exceed this multiple of the baseline P95 to count as degradation.
pub const INFLECTION_FACTOR: f64 = 2.0;

/// Statistics summary for a dataset. All zero when `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

impl Stats {
    pub fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Computes min, max, mean; zeros for an empty input instead of NaN/infinity.
pub fn calculate_stats<I>(data: I) -> Stats
where
    I: IntoIterator<Item = f64>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in data {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    if count == 0 {
        return Stats::empty();
    }

    Stats {
        min,
        max,
        mean: sum / count as f64,
        count,
    }
}

/// First bucket whose P95 crossed `INFLECTION_FACTOR` × baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inflection {
    pub bucket: BucketIndex,
    pub start_ms: i64,
    pub baseline_p95: f64,
    pub p95: f64,
    /// Max concurrency of that bucket, or of the nearest earlier bucket that has one.
    pub concurrency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStats {
    pub max_concurrency: f64,
    pub concurrency: Stats,
    pub latency: Stats,
    pub cpu: Stats,
    pub inflection: Option<Inflection>,
}

impl AggregateStats {
    pub fn has_cpu(&self) -> bool {
        self.cpu.has_data()
    }
}

pub fn summarize(series: &AlignedSeries, raw_cpu: &[f64]) -> AggregateStats {
    let concurrency = calculate_stats(series.concurrency_max.iter().flatten().copied());
    let latency = calculate_stats(series.latency_p95.iter().flatten().copied());
    let cpu = calculate_stats(raw_cpu.iter().copied());

    AggregateStats {
        max_concurrency: concurrency.max,
        concurrency,
        latency,
        cpu,
        inflection: detect_inflection(series, INFLECTION_FACTOR),
    }
}

/// Scans buckets ascending; baseline is the P95 of the first bucket with latency data.
pub fn detect_inflection(series: &AlignedSeries, factor: f64) -> Option<Inflection> {
    let mut baseline: Option<f64> = None;
    let mut last_concurrency: Option<f64> = None;

    for row in series.rows() {
        if row.concurrency_max.is_some() {
            last_concurrency = row.concurrency_max;
        }
        let Some(p95) = row.latency_p95 else {
            continue;
        };
        match baseline {
            None => baseline = Some(p95),
            Some(base) if base > 0.0 && p95 > base * factor => {
                return Some(Inflection {
                    bucket: row.index,
                    start_ms: row.start_ms,
                    baseline_p95: base,
                    p95,
                    concurrency: last_concurrency,
                });
            }
            Some(_) => {}
        }
    }
    None
}
