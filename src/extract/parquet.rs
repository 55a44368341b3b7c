//! Parquet rows.

use std::path::Path;

use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::reader::RowIter;
use parquet::record::Field;

use crate::error::EtlResult;
use crate::types::{FieldId, Row, Value};

use super::adapter::{FileOptions, FileSource, FileSourceAdapter, RowReader};

/// [`RowReader`] for Parquet files, using the Parquet record API.
///
/// Fields are keyed by top-level column name. Nested groups and lists are rendered as text.
#[derive(Default)]
pub struct ParquetRows {
    rows: Option<RowIter<'static>>,
}

impl std::fmt::Debug for ParquetRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetRows")
            .field("open", &self.rows.is_some())
            .finish()
    }
}

impl ParquetRows {
    /// Adapter reading `path`.
    pub fn from_path(path: impl AsRef<Path>) -> FileSourceAdapter<Self> {
        FileSourceAdapter::new(FileSource::path(path.as_ref()), Self::default())
    }

    /// Adapter reading `source` with explicit file options.
    pub fn source(source: FileSource, file: FileOptions) -> FileSourceAdapter<Self> {
        FileSourceAdapter::with_options(source, Self::default(), file)
    }
}

impl RowReader for ParquetRows {
    fn open(&mut self, path: &Path) -> EtlResult<()> {
        let reader = SerializedFileReader::try_from(path)?;
        self.rows = Some(reader.into_iter());
        Ok(())
    }

    fn read_row(&mut self) -> EtlResult<Option<Row>> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        let Some(row) = rows.next() else {
            return Ok(None);
        };
        let row = row?;
        Ok(Some(
            row.get_column_iter()
                .map(|(name, field)| (FieldId::Name(name.clone()), field_to_value(field)))
                .collect(),
        ))
    }

    fn close(&mut self) {
        self.rows = None;
    }
}

fn field_to_value(f: &Field) -> Value {
    match f {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Byte(v) => Value::Int64(i64::from(*v)),
        Field::Short(v) => Value::Int64(i64::from(*v)),
        Field::Int(v) => Value::Int64(i64::from(*v)),
        Field::Long(v) => Value::Int64(*v),
        Field::UByte(v) => Value::Int64(i64::from(*v)),
        Field::UShort(v) => Value::Int64(i64::from(*v)),
        Field::UInt(v) => Value::Int64(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).map_or_else(|_| Value::Utf8(v.to_string()), Value::Int64),
        Field::Float(v) => Value::Float64(f64::from(*v)),
        Field::Double(v) => Value::Float64(*v),
        Field::Str(s) => Value::text(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
