use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocadeckError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("SQLite error: {0}")]
    Sqlite(Box<sqlx::Error>),

    #[error("Zip error: {0}")]
    Zip(Box<zip::result::ZipError>),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetRead(Box<calamine::Error>),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWrite(Box<rust_xlsxwriter::XlsxError>),

    /// Malformed or under-populated input spreadsheet.
    #[error("Invalid spreadsheet: {0}")]
    Format(String),

    #[error("Speech synthesis failed for {field} #{row}: {reason}")]
    Synthesis { field: String, row: usize, reason: String },

    #[error("Could not read existing deck {path:?}: {reason}")]
    ContainerRead { path: PathBuf, reason: String },

    #[error("Cleanup of {path:?} failed: {reason}")]
    Cleanup { path: PathBuf, reason: String },

    /// Two rows of the same run share a duplicate key; both are kept.
    #[error("Rows {first} and {repeat} share the duplicate key {key:?}")]
    RepeatedInBatch { key: String, first: usize, repeat: usize },

    #[error("VocadeckError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for VocadeckError {
    fn from(error: std::io::Error) -> Self {
        VocadeckError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for VocadeckError {
    fn from(error: reqwest::Error) -> Self {
        VocadeckError::Reqwest(Box::new(error))
    }
}

impl From<sqlx::Error> for VocadeckError {
    fn from(error: sqlx::Error) -> Self {
        VocadeckError::Sqlite(Box::new(error))
    }
}

impl From<zip::result::ZipError> for VocadeckError {
    fn from(error: zip::result::ZipError) -> Self {
        VocadeckError::Zip(Box::new(error))
    }
}

impl From<calamine::Error> for VocadeckError {
    fn from(error: calamine::Error) -> Self {
        VocadeckError::SpreadsheetRead(Box::new(error))
    }
}

impl From<rust_xlsxwriter::XlsxError> for VocadeckError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        VocadeckError::SpreadsheetWrite(Box::new(error))
    }
}

impl VocadeckError {
    /// Whether the run must stop on this error rather than degrade.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VocadeckError::Format(_))
    }
}
