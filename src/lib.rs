pub mod anki;
pub mod config;
pub mod core;
pub mod persistence;
pub mod spreadsheet;
pub mod tts;

pub use crate::core::{
    pipeline::{
        run,
        RunSummary,
    },
    VocadeckError,
};
