use std::fmt;

use super::VocadeckError;

/// One vocabulary entry read from the spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub word: String,
    pub translation: Option<String>, // None when the sheet has no Translation column
    pub phonetic: Option<String>,    // None when the sheet has no Phonetic column
    pub context: String,
    pub audio_word_ref: String,    // Bare filename, empty when no audio exists
    pub audio_context_ref: String, // Bare filename, empty when no audio exists
}

impl Row {
    pub fn new(word: impl Into<String>, context: impl Into<String>) -> Self {
        Row { word: word.into(), context: context.into(), ..Default::default() }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn with_phonetic(mut self, phonetic: impl Into<String>) -> Self {
        self.phonetic = Some(phonetic.into());
        self
    }

    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey::new(&self.word, &self.context)
    }

    pub fn text(&self, field: AudioField) -> &str {
        match field {
            AudioField::Word => &self.word,
            AudioField::Context => &self.context,
        }
    }

    pub fn audio_ref(&self, field: AudioField) -> &str {
        match field {
            AudioField::Word => &self.audio_word_ref,
            AudioField::Context => &self.audio_context_ref,
        }
    }

    pub fn set_audio_ref(&mut self, field: AudioField, file_name: String) {
        match field {
            AudioField::Word => self.audio_word_ref = file_name,
            AudioField::Context => self.audio_context_ref = file_name,
        }
    }
}

/// `lowercase(trim(word)) + "|" + lowercase(trim(context))`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuplicateKey(String);

impl DuplicateKey {
    pub fn new(word: &str, context: &str) -> Self {
        DuplicateKey(format!("{}|{}", word.trim().to_lowercase(), context.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two text fields of a row that get synthesized speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioField {
    Word,
    Context,
}

impl AudioField {
    pub const ALL: [AudioField; 2] = [AudioField::Word, AudioField::Context];

    pub fn prefix(&self) -> &'static str {
        match self {
            AudioField::Word => "word",
            AudioField::Context => "context",
        }
    }

    /// `word_{n}.mp3` / `context_{n}.mp3`, `position` is 1-based.
    pub fn file_name(&self, position: usize) -> String {
        format!("{}_{}.mp3", self.prefix(), position)
    }
}

/// Value produced by a stage that degrades instead of failing.
#[derive(Debug)]
pub struct Report<T> {
    pub value: T,
    pub warnings: Vec<VocadeckError>,
}

impl<T> Report<T> {
    pub fn new(value: T) -> Self {
        Report { value, warnings: Vec::new() }
    }

    pub fn warn(&mut self, warning: VocadeckError) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_parts(self) -> (T, Vec<VocadeckError>) {
        (self.value, self.warnings)
    }
}
