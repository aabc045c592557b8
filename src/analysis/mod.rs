// Analysis: bucket alignment of the latency, concurrency and CPU series,
// followed by run-wide statistics over the aligned and raw data.

pub mod bucketing;
pub mod summary;
