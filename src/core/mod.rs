pub mod cleanup;
pub mod errors;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod utils;
pub mod workdir;

pub use errors::VocadeckError;
pub use models::{ AudioField, DuplicateKey, Report, Row };
pub use workdir::WorkDir;
