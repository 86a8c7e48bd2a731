use sha1::Sha1;
use sha2::{
    Digest,
    Sha256,
};

use crate::core::{
    utils::StripMarkup,
    DuplicateKey,
};

/// Separator between field values inside a stored note.
pub const FIELD_SEPARATOR: char = '\x1f';

const BASE91_TABLE: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub guid: String,
    pub fields: Vec<String>,
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(fields: Vec<String>) -> Self {
        Note { guid: guid_for(&fields), fields, tags: Vec::new() }
    }

    pub fn joined_fields(&self) -> String {
        join_fields(&self.fields)
    }

    pub fn sort_field(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    pub fn checksum(&self) -> i64 {
        field_checksum(self.sort_field())
    }

    /// Anki stores tags space separated with a leading and trailing space.
    pub fn joined_tags(&self) -> String {
        if self.tags.is_empty() {
            String::new()
        } else {
            format!(" {} ", self.tags.join(" "))
        }
    }
}

pub fn join_fields<S: AsRef<str>>(fields: &[S]) -> String {
    let mut joined = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            joined.push(FIELD_SEPARATOR);
        }
        joined.push_str(field.as_ref());
    }
    joined
}

pub fn split_fields(flds: &str) -> Vec<&str> {
    flds.split(FIELD_SEPARATOR).collect()
}

/// Duplicate key of a stored note. Word is the first field; context is the
/// fourth field if present, else the third, else the second, which covers
/// decks written with fewer fields.
pub fn stored_note_key(flds: &str) -> Option<DuplicateKey> {
    let fields = split_fields(flds);
    let context = match fields.len() {
        0 | 1 => return None,
        2 => fields[1],
        3 => fields[2],
        _ => fields[3],
    };
    Some(DuplicateKey::new(fields[0], context))
}

/// First 32 bits of the SHA-1 of the markup-free field, as Anki computes
/// `csum`. Media names and whitespace count.
pub fn field_checksum(field: &str) -> i64 {
    let digest = Sha1::digest(field.strip_markup().as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as i64
}

/// Stable note GUID derived from field values (sha256, base91 encoded).
pub fn guid_for<S: AsRef<str>>(values: &[S]) -> String {
    let joined = values.iter().map(|v| v.as_ref()).collect::<Vec<_>>().join("__");
    let digest = Sha256::digest(joined.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    base91(u64::from_be_bytes(bytes))
}

fn base91(mut value: u64) -> String {
    if value == 0 {
        return (BASE91_TABLE[0] as char).to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE91_TABLE[(value % 91) as usize] as char);
        value /= 91;
    }
    digits.iter().rev().collect()
}
