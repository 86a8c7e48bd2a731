use crate::core::Row;

pub mod export;
pub mod loader;

pub use export::export_table;
pub use loader::{
    load_bytes,
    load_path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Word,
    Translation,
    Phonetic,
    Context,
}

impl ColumnRole {
    pub fn header(&self) -> &'static str {
        match self {
            ColumnRole::Word => "Word",
            ColumnRole::Translation => "Translation",
            ColumnRole::Phonetic => "Phonetic",
            ColumnRole::Context => "Context",
        }
    }
}

use ColumnRole::*;

/// Positional role assignment, keyed by the number of recognized columns.
/// Headers in the sheet are ignored.
pub const COLUMN_LAYOUTS: &[(usize, &[ColumnRole])] = &[
    (4, &[Word, Translation, Phonetic, Context]),
    (3, &[Word, Translation, Context]),
    (2, &[Word, Context]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    roles: &'static [ColumnRole],
}

impl ColumnLayout {
    /// Layout for a sheet `width` columns wide; extra columns past the
    /// fourth are ignored, fewer than two are rejected.
    pub fn for_width(width: usize) -> Option<Self> {
        let recognized = width.min(4);
        COLUMN_LAYOUTS
            .iter()
            .find(|(count, _)| *count == recognized)
            .map(|(_, roles)| ColumnLayout { roles })
    }

    pub fn roles(&self) -> &'static [ColumnRole] {
        self.roles
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.roles.iter().map(|role| role.header()).collect()
    }
}

/// The in-memory table every pipeline stage transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub layout: ColumnLayout,
    pub rows: Vec<Row>,
}
