// Report: chart image, console summary and CSV export of one analysis run.

pub mod chart;
pub mod console;
pub mod export;

use std::{fs, path::Path};

use crate::error::{AnalysisError, Result};

/// Creates the parent directory of an output file if it does not exist yet.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| AnalysisError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
