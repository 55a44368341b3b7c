#![cfg(feature = "excel")]

//! Spreadsheet rows (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::error::{EtlError, EtlResult};
use crate::types::{FieldId, Row, Value};

use super::adapter::{FileOptions, FileSource, FileSourceAdapter, RowReader};
use super::registry::SheetSelection;

/// [`RowReader`] for one worksheet of a workbook, backed by `calamine`.
///
/// The whole used range of the sheet is loaded on open; rows are then read by (row, column)
/// position within the range bounds. Cells are keyed by absolute 0-based column ordinal, so
/// `FieldId::letters("C")` always refers to the sheet's column C.
#[derive(Debug, Default)]
pub struct Spreadsheet {
    selection: SheetSelection,
    sheet: Option<String>,
    range: Option<Range<Data>>,
    next_row: u32,
}

impl Spreadsheet {
    /// Reader for the selected sheet.
    pub fn new(selection: SheetSelection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    /// Adapter reading the first sheet of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> FileSourceAdapter<Self> {
        FileSourceAdapter::new(FileSource::path(path.as_ref()), Self::default())
    }

    /// Adapter reading `source` with explicit sheet and file options.
    pub fn source(
        source: FileSource,
        selection: SheetSelection,
        file: FileOptions,
    ) -> FileSourceAdapter<Self> {
        FileSourceAdapter::with_options(source, Self::new(selection), file)
    }

    /// Name of the sheet being read, once opened.
    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet.as_deref()
    }
}

impl RowReader for Spreadsheet {
    fn open(&mut self, path: &Path) -> EtlResult<()> {
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names().to_vec();

        let sheet = match &self.selection {
            SheetSelection::First => names.first().cloned(),
            SheetSelection::Index(i) => names.get(*i).cloned(),
            SheetSelection::Named(name) => names.iter().find(|n| *n == name).cloned(),
        }
        .ok_or_else(|| {
            EtlError::open(
                path,
                format!("sheet {:?} not found (sheets={names:?})", self.selection),
            )
        })?;

        let range = workbook.worksheet_range(&sheet)?;
        self.next_row = range.start().map(|(r, _)| r).unwrap_or(0);
        self.range = Some(range);
        self.sheet = Some(sheet);
        Ok(())
    }

    fn read_row(&mut self) -> EtlResult<Option<Row>> {
        let Some(range) = self.range.as_ref() else {
            return Ok(None);
        };
        let (Some((_, first_col)), Some((last_row, last_col))) = (range.start(), range.end()) else {
            return Ok(None);
        };
        if self.next_row > last_row {
            return Ok(None);
        }

        let row = self.next_row;
        self.next_row += 1;
        Ok(Some(
            (first_col..=last_col)
                .map(|col| {
                    let value = range.get_value((row, col)).map(cell_to_value).unwrap_or_default();
                    (FieldId::Column(col as usize), value)
                })
                .collect(),
        ))
    }

    fn close(&mut self) {
        self.range = None;
    }

    fn location(&self) -> Option<String> {
        self.sheet.as_ref().map(|s| format!("sheet '{s}'"))
    }
}

fn cell_to_value(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::text(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) => Value::Utf8(d.to_string()),
        Data::DateTimeIso(s) => Value::text(s.clone()),
        Data::DurationIso(s) => Value::text(s.clone()),
        Data::Error(e) => Value::Utf8(format!("{e:?}")),
    }
}
