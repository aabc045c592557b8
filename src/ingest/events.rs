//! Streaming parser for the load generator's NDJSON metric log.
//!
//! The log can reach millions of lines, so it is read forward-only through one reused
//! line buffer; memory grows with the number of buckets, not with the input size.
//!
//! Per line:
//! - JSON that fails to parse (truncated tail, garbage) → counted as malformed, skipped.
//! - Records that are not `"type": "Point"`, or name another metric → counted as ignored,
//!   whatever their `data` payload looks like.
//! - `http_req_duration` points → latency (ms); `vus` points → concurrency.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use serde::Deserialize;

use crate::{
    analysis::bucketing::SeriesBuckets,
    error::{AnalysisError, Result},
};

pub const LATENCY_METRIC: &str = "http_req_duration";
pub const CONCURRENCY_METRIC: &str = "vus";
pub const PROGRESS_EVERY_LINES: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Latency,
    Concurrency,
}

impl MetricKind {
    pub fn from_metric_name(name: &str) -> Option<Self> {
        match name {
            LATENCY_METRIC => Some(MetricKind::Latency),
            CONCURRENCY_METRIC => Some(MetricKind::Concurrency),
            _ => None,
        }
    }

    pub fn metric_name(&self) -> &'static str {
        match self {
            MetricKind::Latency => LATENCY_METRIC,
            MetricKind::Concurrency => CONCURRENCY_METRIC,
        }
    }
}

/// One point observation: latency in ms or a live VU count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricEvent {
    pub kind: MetricKind,
    pub timestamp_ms: i64,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawRecord {
    Point {
        metric: String,
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct PointData {
    time: DateTime<FixedOffset>,
    value: f64,
}

/// Classification of a single log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    Event(MetricEvent),
    Ignored,
    Malformed,
}

pub fn parse_line(line: &[u8]) -> LineOutcome {
    if line.iter().all(u8::is_ascii_whitespace) {
        return LineOutcome::Ignored;
    }

    let record: RawRecord = match serde_json::from_slice(line) {
        Ok(r) => r,
        Err(_) => return LineOutcome::Malformed,
    };

    match record {
        RawRecord::Point { metric, data } => {
            // Payload is only typed for tracked metrics; other metrics may carry any shape.
            let Some(kind) = MetricKind::from_metric_name(&metric) else {
                return LineOutcome::Ignored;
            };
            match serde_json::from_value::<PointData>(data) {
                Ok(point) if point.value.is_finite() => LineOutcome::Event(MetricEvent {
                    kind,
                    timestamp_ms: point.time.timestamp_millis(),
                    value: point.value,
                }),
                _ => LineOutcome::Malformed,
            }
        }
        RawRecord::Other => LineOutcome::Ignored,
    }
}

/// Line counters for one pass over the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: u64,
    pub accepted: u64,
    pub ignored: u64,
    pub malformed: u64,
}

/// Lazy, forward-only sequence of tracked metric events read from `R`.
///
/// Yields `Err` only for I/O failures of the reader; bad lines are skipped and counted.
pub struct EventStream<R> {
    reader: R,
    buf: Vec<u8>,
    stats: ParseStats,
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(512),
            stats: ParseStats::default(),
        }
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

impl EventStream<BufReader<File>> {
    /// Opens the primary event log; an unreadable file is fatal to the run.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| AnalysisError::EventLogUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::with_capacity(1 << 16, file)))
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = io::Result<MetricEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }

            self.stats.lines += 1;
            if self.stats.lines % PROGRESS_EVERY_LINES == 0 {
                info!(
                    "event log: {} lines processed ({} accepted)",
                    self.stats.lines, self.stats.accepted
                );
            }

            match parse_line(&self.buf) {
                LineOutcome::Event(event) => {
                    self.stats.accepted += 1;
                    return Some(Ok(event));
                }
                LineOutcome::Ignored => self.stats.ignored += 1,
                LineOutcome::Malformed => {
                    self.stats.malformed += 1;
                    debug!("event log: skipping malformed line {}", self.stats.lines);
                }
            }
        }
    }
}

/// Latency and concurrency values grouped by bucket.
#[derive(Debug, Clone)]
pub struct EventBuckets {
    pub latency: SeriesBuckets,
    pub concurrency: SeriesBuckets,
    pub stats: ParseStats,
}

/// Drains an event stream into per-bucket latency and concurrency sequences.
pub fn bucket_events<R: BufRead>(
    stream: &mut EventStream<R>,
    width_ms: i64,
) -> io::Result<EventBuckets> {
    let mut latency = SeriesBuckets::new(width_ms);
    let mut concurrency = SeriesBuckets::new(width_ms);

    for event in stream.by_ref() {
        let event = event?;
        match event.kind {
            MetricKind::Latency => latency.push(event.timestamp_ms, event.value),
            MetricKind::Concurrency => concurrency.push(event.timestamp_ms, event.value),
        }
    }

    Ok(EventBuckets {
        latency,
        concurrency,
        stats: stream.stats(),
    })
}

/// Reads the event log at `path` into bucketed latency and concurrency series.
pub fn parse_event_log(path: &Path, width_ms: i64) -> Result<EventBuckets> {
    info!("Parsing event log {:?}", path);
    let mut stream = EventStream::open(path)?;
    let buckets =
        bucket_events(&mut stream, width_ms).map_err(|source| AnalysisError::EventLogRead {
            path: path.to_path_buf(),
            source,
        })?;

    let s = buckets.stats;
    info!(
        "event log: {} lines total, {} accepted, {} ignored, {} malformed",
        s.lines, s.accepted, s.ignored, s.malformed
    );
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const WIDTH: i64 = 10_000;

    fn point(metric: &str, time: &str, value: f64) -> String {
        format!(
            r#"{{"type":"Point","metric":"{}","data":{{"time":"{}","value":{},"tags":{{"status":"200"}}}}}}"#,
            metric, time, value
        )
    }

    #[test]
    fn parses_tracked_points() {
        let line = point(LATENCY_METRIC, "1970-01-01T00:00:05.250Z", 12.5);
        match parse_line(line.as_bytes()) {
            LineOutcome::Event(e) => {
                assert_eq!(e.kind, MetricKind::Latency);
                assert_eq!(e.timestamp_ms, 5_250);
                assert_eq!(e.value, 12.5);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn offset_timestamps_convert_to_utc_millis() {
        let line = point(CONCURRENCY_METRIC, "1970-01-01T01:00:10+01:00", 3.0);
        assert!(matches!(
            parse_line(line.as_bytes()),
            LineOutcome::Event(MetricEvent { timestamp_ms: 10_000, .. })
        ));
    }

    #[test]
    fn ignores_other_records() {
        let metric_decl = r#"{"type":"Metric","metric":"http_req_duration","data":{"type":"trend","contains":"time"}}"#;
        assert_eq!(parse_line(metric_decl.as_bytes()), LineOutcome::Ignored);

        let other_point = point("http_reqs", "2024-01-01T00:00:00Z", 1.0);
        assert_eq!(parse_line(other_point.as_bytes()), LineOutcome::Ignored);
        assert_eq!(parse_line(b"   \n"), LineOutcome::Ignored);
    }

    #[test]
    fn untracked_points_with_odd_payloads_are_ignored() {
        let no_value = r#"{"type":"Point","metric":"checks","data":{"time":"2024-01-01T00:00:00Z"}}"#;
        let no_data = r#"{"type":"Point","metric":"iterations"}"#;
        assert_eq!(parse_line(no_value.as_bytes()), LineOutcome::Ignored);
        assert_eq!(parse_line(no_data.as_bytes()), LineOutcome::Ignored);

        let tracked_no_value = r#"{"type":"Point","metric":"vus","data":{"time":"2024-01-01T00:00:00Z"}}"#;
        assert_eq!(parse_line(tracked_no_value.as_bytes()), LineOutcome::Malformed);
    }

    #[test]
    fn flags_malformed_lines() {
        assert_eq!(parse_line(b"{\"type\":\"Point\",\"met"), LineOutcome::Malformed);
        assert_eq!(parse_line(b"not json"), LineOutcome::Malformed);
        let bad_time = point(LATENCY_METRIC, "yesterday", 1.0);
        assert_eq!(parse_line(bad_time.as_bytes()), LineOutcome::Malformed);
    }

    #[test]
    fn malformed_lines_do_not_change_accepted_count() {
        let clean = [
            point(LATENCY_METRIC, "1970-01-01T00:00:01Z", 100.0),
            point(LATENCY_METRIC, "1970-01-01T00:00:06Z", 200.0),
            point(CONCURRENCY_METRIC, "1970-01-01T00:00:12Z", 7.0),
        ];
        let mut noisy = clean.to_vec();
        noisy.insert(1, "{garbage".to_string());
        noisy.push(r#"{"type":"Point","metric":"vus","data":{"time":"1970-01"#.to_string());

        let mut a = EventStream::new(Cursor::new(clean.join("\n")));
        let mut b = EventStream::new(Cursor::new(noisy.join("\n")));
        let a_buckets = bucket_events(&mut a, WIDTH).unwrap();
        let b_buckets = bucket_events(&mut b, WIDTH).unwrap();

        assert_eq!(a_buckets.stats.accepted, 3);
        assert_eq!(b_buckets.stats.accepted, 3);
        assert_eq!(b_buckets.stats.malformed, 2);
        assert_eq!(b_buckets.stats.lines, 5);
        assert_eq!(a_buckets.latency, b_buckets.latency);
        assert_eq!(a_buckets.concurrency, b_buckets.concurrency);
    }

    #[test]
    fn events_land_in_floor_bucket() {
        let log = [
            point(LATENCY_METRIC, "1970-01-01T00:00:01Z", 100.0),
            point(LATENCY_METRIC, "1970-01-01T00:00:06Z", 200.0),
            point(CONCURRENCY_METRIC, "1970-01-01T00:00:19.999Z", 7.0),
        ]
        .join("\n");
        let mut stream = EventStream::new(Cursor::new(log));
        let b = bucket_events(&mut stream, WIDTH).unwrap();

        assert_eq!(b.latency.get(0), Some(&[100.0, 200.0][..]));
        assert_eq!(b.concurrency.get(1), Some(&[7.0][..]));
        assert_eq!(b.latency.sample_count() + b.concurrency.sample_count(), 3);
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice(point(LATENCY_METRIC, "1970-01-01T00:00:01Z", 1.0).as_bytes());
        let mut stream = EventStream::new(Cursor::new(bytes));
        let events: Vec<_> = stream.by_ref().collect::<io::Result<_>>().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(stream.stats().malformed, 1);
    }

    #[test]
    fn missing_event_log_is_fatal() {
        let err = parse_event_log(Path::new("/nonexistent/loadtest/events.json"), WIDTH)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EventLogUnavailable { .. }));
    }
}
