use std::{
    fs,
    path::Path,
};

use super::{
    Report,
    VocadeckError,
    WorkDir,
};

/// Best-effort removal of the fixed scratch files and the media staging dir.
/// Never fails; every problem ends up in the report's warnings.
pub fn cleanup(work_dir: &WorkDir) -> Report<usize> {
    let mut report = Report::new(0);

    for file in work_dir.scratch_files() {
        if file.exists() {
            match fs::remove_file(&file) {
                Ok(()) => report.value += 1,
                Err(e) => report.warn(cleanup_error(&file, e)),
            }
        }
    }

    let staging = work_dir.media_staging_dir();
    if staging.exists() {
        match fs::remove_dir_all(&staging) {
            Ok(()) => report.value += 1,
            Err(e) => report.warn(cleanup_error(&staging, e)),
        }
    }

    tracing::debug!(removed = report.value, "cleanup complete");
    report
}

fn cleanup_error(path: &Path, error: std::io::Error) -> VocadeckError {
    VocadeckError::Cleanup { path: path.to_path_buf(), reason: error.to_string() }
}
