// Ingest: readers for the three inputs of an analysis run.
// The event log is mandatory; resource samples and environment metadata are optional.

pub mod environment;
pub mod events;
pub mod resources;
