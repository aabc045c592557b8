//! Error taxonomy for one analysis run.
//!
//! Only whole-file failures on the primary event log and failures writing outputs
//! surface here. Malformed lines and missing optional inputs are handled where they occur.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("event log {path:?} is unavailable: {source}")]
    EventLogUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed reading event log {path:?}: {source}")]
    EventLogRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
