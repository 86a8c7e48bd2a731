use std::path::Path;

use crate::core::{
    AudioField,
    Row,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub word_found: usize,
    pub context_found: usize,
    pub rows: usize,
}

/// Point every row at the audio files that actually exist in `audio_dir`.
/// Only looks at the disk, so running it again gives the same answer.
pub fn resolve_links(rows: &mut [Row], audio_dir: &Path) -> LinkSummary {
    let mut summary = LinkSummary { rows: rows.len(), ..Default::default() };

    for (i, row) in rows.iter_mut().enumerate() {
        for field in AudioField::ALL {
            let file_name = field.file_name(i + 1);
            if audio_dir.join(&file_name).is_file() {
                match field {
                    AudioField::Word => summary.word_found += 1,
                    AudioField::Context => summary.context_found += 1,
                }
                row.set_audio_ref(field, file_name);
            } else {
                tracing::debug!(file = %file_name, "audio not found");
                row.set_audio_ref(field, String::new());
            }
        }
    }

    tracing::info!(
        word = summary.word_found,
        context = summary.context_found,
        rows = summary.rows,
        "linked audio files"
    );
    summary
}
