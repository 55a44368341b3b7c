//! JSON rows.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested objects are flattened into dot paths (`{"user":{"name":"Ada"}}` exposes `user.name`).
//! An empty NDJSON line is a blank row.
//!
//! `open` only reads the file; the document is parsed on the first row request, so malformed
//! content is reported by `next_record` as a JSON error rather than as an unopenable file.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::error::{EtlError, EtlResult};
use crate::types::{FieldId, Row, Value};

use super::adapter::{FileOptions, FileSource, FileSourceAdapter, RowReader};

/// [`RowReader`] for JSON documents. Fields are keyed by name.
#[derive(Debug, Default)]
pub struct JsonRows {
    text: Option<String>,
    rows: Option<VecDeque<Row>>,
}

impl JsonRows {
    /// Adapter reading `path`.
    pub fn from_path(path: impl AsRef<Path>) -> FileSourceAdapter<Self> {
        FileSourceAdapter::new(FileSource::path(path.as_ref()), Self::default())
    }

    /// Adapter reading `source` with explicit file options.
    pub fn source(source: FileSource, file: FileOptions) -> FileSourceAdapter<Self> {
        FileSourceAdapter::with_options(source, Self::default(), file)
    }
}

impl RowReader for JsonRows {
    fn open(&mut self, path: &Path) -> EtlResult<()> {
        self.text = Some(fs::read_to_string(path).map_err(|e| EtlError::open(path, e))?);
        self.rows = None;
        Ok(())
    }

    fn read_row(&mut self) -> EtlResult<Option<Row>> {
        if let Some(text) = self.text.take() {
            self.rows = Some(parse_rows(&text)?);
        }
        Ok(self.rows.as_mut().and_then(VecDeque::pop_front))
    }

    fn close(&mut self) {
        self.text = None;
        self.rows = None;
    }
}

/// Parse a JSON array, a single object, or NDJSON into flattened rows.
pub fn parse_rows(input: &str) -> EtlResult<VecDeque<Row>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(VecDeque::new());
    }

    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return match v {
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| object_row(i + 1, item))
                .collect(),
            serde_json::Value::Object(_) => Ok(VecDeque::from([object_row(1, &v)?])),
            _ => Err(EtlError::config(
                "json must be an object, an array of objects, or NDJSON",
            )),
        };
    }

    let mut rows = VecDeque::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            rows.push_back(Row::new());
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line)?;
        rows.push_back(object_row(i + 1, &v)?);
    }
    Ok(rows)
}

fn object_row(row_num: usize, v: &serde_json::Value) -> EtlResult<Row> {
    let obj = v
        .as_object()
        .ok_or_else(|| EtlError::config(format!("json row {row_num} is not an object")))?;
    let mut row = Row::new();
    flatten(obj, "", &mut row);
    Ok(row)
}

fn flatten(obj: &serde_json::Map<String, serde_json::Value>, prefix: &str, out: &mut Row) {
    for (key, v) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match v {
            serde_json::Value::Object(inner) => flatten(inner, &path, out),
            other => out.push((FieldId::Name(path), json_to_value(other))),
        }
    }
}

fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map_or(Value::Null, Value::Float64),
        },
        serde_json::Value::String(s) => Value::text(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
