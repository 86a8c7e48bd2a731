use async_trait::async_trait;
use reqwest::Client;

use super::SpeechSynthesizer;
use crate::core::{
    http::{
        get_bytes,
        http_client,
    },
    VocadeckError,
};

const ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects requests longer than this many characters
const MAX_CHUNK_CHARS: usize = 100;

/// Google Translate's public speech endpoint, the voice used by gTTS.
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: String,
}

impl GoogleTranslateTts {
    pub fn new() -> Result<Self, VocadeckError> {
        Ok(Self { client: http_client()?, endpoint: ENDPOINT.to_string() })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        slow: bool,
    ) -> Result<Vec<u8>, VocadeckError> {
        let chunks = split_into_chunks(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(VocadeckError::Custom("nothing to synthesize".to_string()));
        }

        let total = chunks.len();
        let speed = if slow { "0.3" } else { "1" };
        let mut audio = Vec::new();

        // MP3 frames concatenate cleanly, so chunk streams are appended in order
        for (idx, chunk) in chunks.iter().enumerate() {
            let query = [
                ("ie", "UTF-8".to_string()),
                ("client", "tw-ob".to_string()),
                ("tl", language.to_string()),
                ("ttsspeed", speed.to_string()),
                ("q", chunk.clone()),
                ("textlen", chunk.chars().count().to_string()),
                ("idx", idx.to_string()),
                ("total", total.to_string()),
            ];
            let bytes = get_bytes(&self.client, &self.endpoint, &query).await?;
            audio.extend_from_slice(&bytes);
        }

        tracing::trace!(chunks = total, bytes = audio.len(), "google tts response");
        Ok(audio)
    }
}

/// Split text into pieces of at most `max_chars` characters, preferring
/// punctuation, then whitespace, and hard-splitting overlong words.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_string());
            break;
        }

        // Byte offset just past the `max_chars`-th character
        let limit = rest.char_indices().nth(max_chars).map(|(i, _)| i).unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = window
            .rfind(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
            .map(|i| i + 1)
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let (head, tail) = rest.split_at(cut);
        let head = head.trim();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        rest = tail.trim_start();
    }

    chunks
}
