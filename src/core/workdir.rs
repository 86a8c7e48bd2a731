use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tempfile::TempDir;

use super::VocadeckError;

const MEDIA_STAGING_DIR: &str = "temp_audio_merge";
const SCRATCH_FILES: &[&str] = &["temp_excel.xlsx", "excel_com_audios.xlsx"];

/// Scratch root shared by every stage of a run. Nothing below derives a path
/// from the process environment; everything hangs off this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        WorkDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<(), VocadeckError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// `Audios_<deck name>` with spaces replaced by underscores.
    pub fn audio_dir(&self, deck_name: &str) -> PathBuf {
        self.root.join(audio_folder_name(deck_name))
    }

    /// Holding area for media carried over from an existing deck.
    pub fn media_staging_dir(&self) -> PathBuf {
        self.root.join(MEDIA_STAGING_DIR)
    }

    pub fn scratch_files(&self) -> Vec<PathBuf> {
        SCRATCH_FILES.iter().map(|name| self.root.join(name)).collect()
    }

    /// Fresh directory removed when the handle drops.
    pub fn extraction_dir(&self) -> Result<TempDir, VocadeckError> {
        self.ensure()?;
        Ok(tempfile::Builder::new().prefix("extract-").tempdir_in(&self.root)?)
    }
}

pub fn audio_folder_name(deck_name: &str) -> String {
    format!("Audios_{}", deck_name.replace(' ', "_"))
}
