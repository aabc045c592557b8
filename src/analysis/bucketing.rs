//! Time bucketing: aligns independently sampled series onto one discrete axis.
//!
//! - **SeriesBuckets:** per-series map bucket index → values, in arrival order.
//! - **AlignedSeries:** union of all bucket indices with P95 latency, max concurrency, max CPU.
//!
//! A bucket with no values for a series yields `None` for that series, never 0.

use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_BUCKET_WIDTH_MS: i64 = 10_000;
pub const P95: f64 = 0.95;

pub type BucketIndex = i64;

/// `floor(timestamp_ms / width_ms)`; floor division so pre-epoch instants stay in one bucket.
#[inline]
pub fn bucket_index(timestamp_ms: i64, width_ms: i64) -> BucketIndex {
    timestamp_ms.div_euclid(width_ms)
}

/// Values of one series grouped by bucket index.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuckets {
    width_ms: i64,
    buckets: BTreeMap<BucketIndex, Vec<f64>>,
}

impl SeriesBuckets {
    pub fn new(width_ms: i64) -> Self {
        assert!(width_ms > 0, "bucket width must be positive");
        Self {
            width_ms,
            buckets: BTreeMap::new(),
        }
    }

    /// Appends `value` to the bucket owning `timestamp_ms`.
    pub fn push(&mut self, timestamp_ms: i64, value: f64) {
        let idx = bucket_index(timestamp_ms, self.width_ms);
        self.buckets.entry(idx).or_default().push(value);
    }

    pub fn width_ms(&self) -> i64 {
        self.width_ms
    }

    pub fn get(&self, idx: BucketIndex) -> Option<&[f64]> {
        self.buckets.get(&idx).map(Vec::as_slice)
    }

    /// Bucket indices holding at least one value, ascending.
    pub fn indices(&self) -> impl Iterator<Item = BucketIndex> + '_ {
        self.buckets.keys().copied()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of values across all buckets.
    pub fn sample_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Floor-index percentile: element at `floor(n * q)` of the sorted values, clamped to the last.
///
/// Kept as the simple estimator (no interpolation) so reported figures stay comparable
/// across runs. Order-independent; `None` for an empty slice.
pub fn percentile_floor(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}

pub fn p95(values: &[f64]) -> Option<f64> {
    percentile_floor(values, P95)
}

pub fn max_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// One row of the aligned axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketRow {
    pub index: BucketIndex,
    pub start_ms: i64,
    pub latency_p95: Option<f64>,
    pub concurrency_max: Option<f64>,
    pub cpu_max: Option<f64>,
}

/// The three per-bucket series on a shared ascending axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub width_ms: i64,
    pub buckets: Vec<BucketIndex>,
    pub latency_p95: Vec<Option<f64>>,
    pub concurrency_max: Vec<Option<f64>>,
    pub cpu_max: Vec<Option<f64>>,
}

impl AlignedSeries {
    /// Builds the axis from the union (not the intersection) of indices present in any series.
    ///
    /// CPU uses max rather than mean so transient saturation peaks survive bucketing.
    pub fn align(
        latency: &SeriesBuckets,
        concurrency: &SeriesBuckets,
        cpu: &SeriesBuckets,
    ) -> Self {
        debug_assert_eq!(latency.width_ms(), concurrency.width_ms());
        debug_assert_eq!(latency.width_ms(), cpu.width_ms());

        let buckets: Vec<BucketIndex> = latency
            .indices()
            .chain(concurrency.indices())
            .chain(cpu.indices())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let latency_p95 = buckets
            .iter()
            .map(|&idx| latency.get(idx).and_then(p95))
            .collect();
        let concurrency_max = buckets
            .iter()
            .map(|&idx| concurrency.get(idx).and_then(max_value))
            .collect();
        let cpu_max = buckets
            .iter()
            .map(|&idx| cpu.get(idx).and_then(max_value))
            .collect();

        Self {
            width_ms: latency.width_ms(),
            buckets,
            latency_p95,
            concurrency_max,
            cpu_max,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_start_ms(&self, idx: BucketIndex) -> i64 {
        idx * self.width_ms
    }

    /// True when at least one bucket carries a CPU value.
    pub fn has_cpu(&self) -> bool {
        self.cpu_max.iter().any(Option::is_some)
    }

    pub fn rows(&self) -> impl Iterator<Item = BucketRow> + '_ {
        self.buckets.iter().enumerate().map(|(i, &idx)| BucketRow {
            index: idx,
            start_ms: self.bucket_start_ms(idx),
            latency_p95: self.latency_p95[i],
            concurrency_max: self.concurrency_max[i],
            cpu_max: self.cpu_max[i],
        })
    }
}
