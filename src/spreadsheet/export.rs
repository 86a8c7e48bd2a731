use std::path::Path;

use rust_xlsxwriter::Workbook;

use super::{
    ColumnRole,
    Table,
};
use crate::core::{
    AudioField,
    VocadeckError,
};

pub const AUDIO_HEADERS: [&str; 2] = ["Audio_Word", "Audio_Context"];

/// Write the table with the two audio reference columns appended.
pub fn export_table(table: &Table, path: &Path) -> Result<(), VocadeckError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let headers: Vec<&str> =
        table.layout.headers().into_iter().chain(AUDIO_HEADERS.iter().copied()).collect();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let mut cells: Vec<&str> = table
            .layout
            .roles()
            .iter()
            .map(|role| match role {
                ColumnRole::Word => row.word.as_str(),
                ColumnRole::Translation => row.translation.as_deref().unwrap_or_default(),
                ColumnRole::Phonetic => row.phonetic.as_deref().unwrap_or_default(),
                ColumnRole::Context => row.context.as_str(),
            })
            .collect();
        cells.extend(AudioField::ALL.iter().map(|field| row.audio_ref(*field)));

        for (col, value) in cells.iter().enumerate() {
            worksheet.write_string(r, col as u16, *value)?;
        }
    }

    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = table.rows.len(), "exported spreadsheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use calamine::{
        open_workbook_auto,
        Reader,
    };

    use super::*;
    use crate::{
        core::Row,
        spreadsheet::ColumnLayout,
    };

    #[test]
    fn test_export_appends_audio_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck_with_audio.xlsx");
        let mut row = Row::new("dog", "the dog ran");
        row.audio_word_ref = "word_1.mp3".to_string();
        let table = Table { layout: ColumnLayout::for_width(2).unwrap(), rows: vec![row] };

        export_table(&table, &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(cells[0], vec!["Word", "Context", "Audio_Word", "Audio_Context"]);
        assert_eq!(cells[1], vec!["dog", "the dog ran", "word_1.mp3", ""]);
    }
}
