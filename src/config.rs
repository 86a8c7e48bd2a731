use std::path::{
    Path,
    PathBuf,
};

use clap::{
    Args,
    Parser,
    Subcommand,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    anki::DeckIdentity,
    core::{
        VocadeckError,
        WorkDir,
    },
    tts::SpeechSettings,
};

pub const SETTINGS_FILE: &str = "settings.json";

pub const DEFAULT_DECK_ID: i64 = 2059400110;
pub const DEFAULT_MODEL_ID: i64 = 1607392319;

const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// Values remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub deck_name: String,
    pub speed: f32,
    pub language: String,
    pub deck_id: i64,
    pub model_id: i64,
    pub work_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deck_name: "English Words".to_string(),
            speed: 1.0,
            language: "en".to_string(),
            deck_id: DEFAULT_DECK_ID,
            model_id: DEFAULT_MODEL_ID,
            work_dir: None,
            output_dir: None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "vocadeck", version, about = "Turn a vocabulary spreadsheet into an Anki deck with audio")]
pub struct Cli {
    /// Directory holding settings.json (defaults to the platform data dir)
    #[arg(long, global = true, env = "VOCADECK_SETTINGS_DIR")]
    pub settings_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synthesize audio for a spreadsheet and merge it into the deck
    Build(BuildArgs),
    /// Show what an existing deck contains
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Spreadsheet with Word | Translation | Phonetic | Context columns
    pub input: PathBuf,

    #[arg(long)]
    pub deck_name: Option<String>,

    /// Relative speech speed, 0.5 to 2.0; below 0.8 uses the slow voice
    #[arg(long)]
    pub speed: Option<f32>,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub deck_id: Option<i64>,

    #[arg(long)]
    pub model_id: Option<i64>,

    /// Scratch directory for audio and temporary files
    #[arg(long, env = "VOCADECK_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Where the .apkg and the exported spreadsheet are written
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Remember the effective values for later runs
    #[arg(long)]
    pub save_settings: bool,
}

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    pub deck: PathBuf,

    #[arg(long, env = "VOCADECK_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

impl BuildArgs {
    /// Flags given on the command line win over stored settings.
    pub fn apply(&self, settings: Settings) -> Settings {
        Settings {
            deck_name: self.deck_name.clone().unwrap_or(settings.deck_name),
            speed: self.speed.unwrap_or(settings.speed),
            language: self.language.clone().unwrap_or(settings.language),
            deck_id: self.deck_id.unwrap_or(settings.deck_id),
            model_id: self.model_id.unwrap_or(settings.model_id),
            work_dir: self.work_dir.clone().or(settings.work_dir),
            output_dir: self.output_dir.clone().or(settings.output_dir),
        }
    }
}

/// Fully resolved inputs of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub identity: DeckIdentity,
    pub speech: SpeechSettings,
    pub work_dir: WorkDir,
    pub output_dir: PathBuf,
}

impl RunConfig {
    /// `default_work_root` and `default_output_dir` fill in directories the
    /// settings leave open.
    pub fn resolve(
        input: &Path,
        settings: &Settings,
        default_work_root: &Path,
        default_output_dir: &Path,
    ) -> Result<Self, VocadeckError> {
        let deck_name = settings.deck_name.trim();
        if deck_name.is_empty() {
            return Err(VocadeckError::Custom("Deck name must not be empty".to_string()));
        }
        if !SPEED_RANGE.contains(&settings.speed) {
            return Err(VocadeckError::Custom(format!(
                "Speed {} is outside {:?}",
                settings.speed, SPEED_RANGE
            )));
        }

        Ok(RunConfig {
            input: input.to_path_buf(),
            identity: DeckIdentity {
                name: deck_name.to_string(),
                deck_id: settings.deck_id,
                model_id: settings.model_id,
            },
            speech: SpeechSettings { language: settings.language.clone(), speed: settings.speed },
            work_dir: WorkDir::new(
                settings.work_dir.clone().unwrap_or_else(|| default_work_root.to_path_buf()),
            ),
            output_dir: settings
                .output_dir
                .clone()
                .unwrap_or_else(|| default_output_dir.to_path_buf()),
        })
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir.audio_dir(&self.identity.name)
    }

    pub fn deck_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.apkg", file_safe(&self.identity.name)))
    }

    pub fn export_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_with_audio.xlsx", file_safe(&self.identity.name)))
    }
}

fn file_safe(name: &str) -> String {
    name.chars().map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c }).collect()
}
