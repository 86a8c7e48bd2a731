use std::{
    fs,
    io::Cursor,
    path::Path,
};

use calamine::{
    open_workbook_auto_from_rs,
    Data,
    Reader,
};

use super::{
    ColumnLayout,
    ColumnRole,
    Table,
};
use crate::core::{
    Row,
    VocadeckError,
};

pub fn load_path(path: &Path) -> Result<Table, VocadeckError> {
    let bytes = fs::read(path).map_err(|e| {
        VocadeckError::Format(format!("Cannot read spreadsheet {}: {}", path.display(), e))
    })?;
    load_bytes(&bytes)
}

/// Read the first worksheet. The first row is a header and is skipped;
/// columns are assigned by position only.
pub fn load_bytes(bytes: &[u8]) -> Result<Table, VocadeckError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| VocadeckError::Format(format!("Unreadable spreadsheet: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| VocadeckError::Format("The workbook has no worksheets".to_string()))?
        .map_err(|e| VocadeckError::Format(format!("Unreadable first worksheet: {}", e)))?;

    let layout = ColumnLayout::for_width(range.width()).ok_or_else(|| {
        VocadeckError::Format(format!(
            "The sheet must have at least 2 columns, found {}",
            range.width()
        ))
    })?;

    let rows: Vec<Row> = range
        .rows()
        .skip(1)
        .filter_map(|cells| build_row(layout, cells))
        .collect();

    if rows.is_empty() {
        return Err(VocadeckError::Format("The sheet has no data rows".to_string()));
    }

    tracing::info!(rows = rows.len(), columns = ?layout.headers(), "loaded spreadsheet");
    Ok(Table { layout, rows })
}

fn build_row(layout: ColumnLayout, cells: &[Data]) -> Option<Row> {
    let values: Vec<String> = (0..layout.roles().len()).map(|i| cell_text(cells.get(i))).collect();
    if values.iter().all(|v| v.trim().is_empty()) {
        return None;
    }

    let mut row = Row::default();
    for (role, value) in layout.roles().iter().zip(values) {
        match role {
            ColumnRole::Word => row.word = value,
            ColumnRole::Translation => row.translation = Some(value),
            ColumnRole::Phonetic => row.phonetic = Some(value),
            ColumnRole::Context => row.context = value,
        }
    }
    Some(row)
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        // 3.0 reads back as "3", like the sheet shows it
        Some(Data::Float(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    use super::*;

    /// Build an xlsx buffer from string cells, first row being the header.
    pub(crate) fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, cells) in rows.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                if !cell.is_empty() {
                    worksheet.write_string(r as u32, c as u16, *cell).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_four_columns_map_positionally() {
        let bytes = xlsx(&[
            &["Palavra", "Tradução", "Fonética", "Frase", "Notes"],
            &["dog", "cão", "dɔg", "The dog ran", "ignored"],
        ]);
        let table = load_bytes(&bytes).unwrap();
        assert!(table.layout.has(ColumnRole::Phonetic));
        assert_eq!(table.rows, vec![Row::new("dog", "The dog ran")
            .with_translation("cão")
            .with_phonetic("dɔg")]);
    }

    #[test]
    fn test_three_columns_have_no_phonetic() {
        let bytes = xlsx(&[&["a", "b", "c"], &["cat", "gato", "the cat sat"]]);
        let table = load_bytes(&bytes).unwrap();
        assert_eq!(table.layout.headers(), vec!["Word", "Translation", "Context"]);
        assert_eq!(table.rows[0].translation.as_deref(), Some("gato"));
        assert_eq!(table.rows[0].phonetic, None);
        assert_eq!(table.rows[0].context, "the cat sat");
    }

    #[test]
    fn test_two_columns_expose_word_and_context_only() {
        let bytes = xlsx(&[&["w", "c"], &["run", "run fast"], &["walk", ""]]);
        let table = load_bytes(&bytes).unwrap();
        assert_eq!(table.layout.headers(), vec!["Word", "Context"]);
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|r| r.translation.is_none() && r.phonetic.is_none()));
        assert_eq!(table.rows[1].context, "");
    }

    #[test]
    fn test_single_column_is_rejected() {
        let bytes = xlsx(&[&["only"], &["dog"]]);
        assert!(matches!(load_bytes(&bytes), Err(VocadeckError::Format(_))));
    }

    #[test]
    fn test_header_only_is_rejected() {
        let bytes = xlsx(&[&["Word", "Context"]]);
        assert!(matches!(load_bytes(&bytes), Err(VocadeckError::Format(_))));
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let bytes = xlsx(&[&["Word", "Context"], &["", ""], &["dog", "a dog"]]);
        let table = load_bytes(&bytes).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].word, "dog");
    }

    #[test]
    fn test_garbage_bytes_are_a_format_error() {
        assert!(matches!(load_bytes(b"not a workbook"), Err(VocadeckError::Format(_))));
    }

    #[test]
    fn test_missing_file_is_a_format_error() {
        let err = load_path(Path::new("/no/such/sheet.xlsx")).unwrap_err();
        assert!(err.is_fatal());
    }
}
