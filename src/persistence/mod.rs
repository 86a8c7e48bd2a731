use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::core::VocadeckError;

const APP_NAME: &str = "vocadeck";

/// Platform data directory for this tool; falls back to the current dir.
/// Only the binary calls this, library code takes the directory it is given.
pub fn app_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => data_dir.join(APP_NAME),
        None => PathBuf::from("."),
    }
}

pub fn save_json<T: Serialize>(data: &T, dir: &Path, filename: &str) -> Result<(), VocadeckError> {
    fs::create_dir_all(dir)?;
    let file_path = dir.join(filename);
    let json = serde_json::to_string_pretty(data)?;
    fs::write(&file_path, json)?;
    tracing::info!(path = %file_path.display(), "data saved");
    Ok(())
}

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(
    dir: &Path,
    filename: &str,
) -> Result<T, VocadeckError> {
    let file_path = dir.join(filename);

    if !file_path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(&file_path)?;
    let data: T = serde_json::from_str(&json)?;
    tracing::debug!(path = %file_path.display(), "data loaded");
    Ok(data)
}

pub fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(dir: &Path, filename: &str) -> T {
    match load_json::<T>(dir, filename) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Failed to load {}: {}. Using defaults.", filename, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        speed: f32,
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let sample = Sample { name: "Deck".to_string(), speed: 0.7 };
        save_json(&sample, &dir.path().join("nested"), "s.json").unwrap();
        let loaded: Sample = load_json(&dir.path().join("nested"), "s.json").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_missing_or_broken_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing: Sample = load_json(dir.path(), "none.json").unwrap();
        assert_eq!(missing, Sample::default());

        fs::write(dir.path().join("bad.json"), "{ nope").unwrap();
        assert!(load_json::<Sample>(dir.path(), "bad.json").is_err());
        assert_eq!(load_json_or_default::<Sample>(dir.path(), "bad.json"), Sample::default());
    }
}
