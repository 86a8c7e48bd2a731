use std::{
    path::Path,
    sync::OnceLock,
};

use regex::Regex;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "wav", "m4a", "flac", "opus"];

/// Text Anki checksums and sorts on: tags and comments removed, image
/// sources kept as ` name `, common entities decoded. Sound tags and
/// surrounding whitespace are left as they are.
pub trait StripMarkup {
    fn strip_markup(&self) -> String;
}

//"<b>dog</b><img src="a.png"> [sound:x.mp3]" -> "dog a.png  [sound:x.mp3]"
impl StripMarkup for str {
    fn strip_markup(&self) -> String {
        static MEDIA: OnceLock<Regex> = OnceLock::new();
        static MARKUP: OnceLock<Regex> = OnceLock::new();
        let media = MEDIA.get_or_init(|| {
            Regex::new(r#"(?si)<img[^>]+src=(?:"([^"]+)"|'([^']+)'|([^ >]+))[^>]*>"#)
                .expect("media pattern is valid")
        });
        let markup = MARKUP.get_or_init(|| {
            Regex::new(r"(?si)<!--.*?-->|<.*?>").expect("markup pattern is valid")
        });

        let with_names = media.replace_all(self, " ${1}${2}${3} ");
        let text = markup.replace_all(&with_names, "");
        if !text.contains('&') {
            return text.into_owned();
        }
        text.replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }
}

impl StripMarkup for String {
    fn strip_markup(&self) -> String {
        self.as_str().strip_markup()
    }
}

/// Playback tag understood by Anki.
pub fn sound_tag(file_name: &str) -> String {
    format!("[sound:{}]", file_name)
}

pub fn is_audio_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
