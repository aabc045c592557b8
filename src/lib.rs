//! # Load test analysis
//!
//! Post-hoc, batch analysis of a finished load test against a containerized endpoint.
//!
//! ## Inputs
//! - Load generator metric log (NDJSON, potentially millions of lines): request duration + live VUs.
//! - Container resource samples (NDJSON, optional): CPU percentage per snapshot.
//! - Environment metadata (JSON, optional): host, container and tool facts for the chart header.
//!
//! ## Pipeline
//! 1. Stream-parse the metric log into 10 s buckets.
//! 2. Load resource samples into the same buckets, keeping the raw sequence too.
//! 3. Align on the union of buckets: P95 latency, max concurrency, max CPU.
//! 4. Summarize: min/avg/max per series (CPU over raw samples), inflection point.
//! 5. Render the multi-axis chart, console summary and optional CSV.

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod report;
