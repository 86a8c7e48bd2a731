use std::{
    fs,
    io,
    path::Path,
};

use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};

use crate::core::{
    AudioField,
    Report,
    Row,
    VocadeckError,
};

pub mod google;
pub mod links;

pub use google::GoogleTranslateTts;
pub use links::{
    resolve_links,
    LinkSummary,
};

/// Below this relative speed the provider's "slow" voice is used; it has no
/// continuous rate control.
pub const SLOW_SPEED_THRESHOLD: f32 = 0.8;

/// Text-to-speech provider returning a complete MP3 stream.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str, slow: bool)
        -> Result<Vec<u8>, VocadeckError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    pub language: String,
    pub speed: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self { language: "en".to_string(), speed: 1.0 }
    }
}

impl SpeechSettings {
    pub fn slow(&self) -> bool {
        self.speed < SLOW_SPEED_THRESHOLD
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisSummary {
    pub written: usize,
    pub failed: usize,
    pub skipped_blank: usize,
}

/// Synthesize every non-blank word and context into `audio_dir`.
/// One failed item never stops the batch: it is reported and its file is
/// left absent. Files left by an earlier run at the same position are
/// removed first so they are never linked to a different row.
pub async fn synthesize_rows(
    rows: &[Row],
    audio_dir: &Path,
    synthesizer: &dyn SpeechSynthesizer,
    settings: &SpeechSettings,
) -> Result<Report<SynthesisSummary>, VocadeckError> {
    fs::create_dir_all(audio_dir)?;
    let slow = settings.slow();
    let mut report = Report::new(SynthesisSummary::default());

    for field in AudioField::ALL {
        for (i, row) in rows.iter().enumerate() {
            let position = i + 1;
            let target = audio_dir.join(field.file_name(position));
            remove_stale(&target)?;

            let text = row.text(field).trim();
            if text.is_empty() {
                report.value.skipped_blank += 1;
                continue;
            }

            match synthesize_one(synthesizer, text, &settings.language, slow, &target).await {
                Ok(()) => {
                    tracing::debug!(row = position, field = field.prefix(), "synthesized");
                    report.value.written += 1;
                }
                Err(e) => {
                    report.value.failed += 1;
                    report.warn(VocadeckError::Synthesis {
                        field: field.prefix().to_string(),
                        row: position,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    tracing::info!(
        written = report.value.written,
        failed = report.value.failed,
        dir = %audio_dir.display(),
        "audio synthesis finished"
    );
    Ok(report)
}

fn remove_stale(target: &Path) -> Result<(), VocadeckError> {
    match fs::remove_file(target) {
        Ok(()) => {
            tracing::debug!(file = %target.display(), "removed stale audio");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn synthesize_one(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    language: &str,
    slow: bool,
    target: &Path,
) -> Result<(), VocadeckError> {
    let audio = synthesizer.synthesize(text, language, slow).await?;
    if audio.is_empty() {
        return Err(VocadeckError::Custom("provider returned no audio".to_string()));
    }
    fs::write(target, audio)?;
    Ok(())
}
