//! Core data model types shared by extractors, loaders and the pipeline.
//!
//! Extractors produce [`Record`]s whose raw values are keyed by [`FieldId`]. The transform step
//! copies values into a loader's output buffer, which is a plain [`Fields`] map keyed by
//! destination field name.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::column;
use crate::error::EtlResult;

/// Logical data type, used to coerce values for typed destinations such as SQL columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// SQL column type name used when creating destination tables.
    pub fn sql_type(self) -> &'static str {
        match self {
            DataType::Int64 => "INTEGER",
            DataType::Float64 => "REAL",
            DataType::Bool => "BOOLEAN",
            DataType::Utf8 => "TEXT",
        }
    }
}

/// A single value read from a source or written to a destination.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    #[default]
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Build a string value, mapping the empty string to [`Value::Null`].
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() { Value::Null } else { Value::Utf8(s) }
    }

    /// True for `Null` and for strings that contain only whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Utf8(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Borrow the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Convert this value into `data_type`.
    ///
    /// Strings are parsed, integral floats become integers, and `Null` (or an empty string)
    /// stays `Null`. The error is a human-readable reason.
    pub fn coerce(&self, data_type: DataType) -> Result<Value, String> {
        if self.is_empty() {
            return Ok(Value::Null);
        }

        match (data_type, self) {
            (DataType::Utf8, Value::Utf8(s)) => Ok(Value::Utf8(s.clone())),
            (DataType::Utf8, other) => Ok(Value::Utf8(other.to_string())),

            (DataType::Int64, Value::Int64(v)) => Ok(Value::Int64(*v)),
            (DataType::Int64, Value::Bool(b)) => Ok(Value::Int64(i64::from(*b))),
            (DataType::Int64, Value::Float64(f)) => {
                if f.fract() == 0.0 {
                    Ok(Value::Int64(*f as i64))
                } else {
                    Err("expected integer (got non-integer float)".to_string())
                }
            }
            (DataType::Int64, Value::Utf8(s)) => {
                s.trim().parse::<i64>().map(Value::Int64).map_err(|e| e.to_string())
            }

            (DataType::Float64, Value::Float64(f)) => Ok(Value::Float64(*f)),
            (DataType::Float64, Value::Int64(i)) => Ok(Value::Float64(*i as f64)),
            (DataType::Float64, Value::Utf8(s)) => {
                s.trim().parse::<f64>().map(Value::Float64).map_err(|e| e.to_string())
            }
            (DataType::Float64, Value::Bool(_)) => Err("expected number".to_string()),

            (DataType::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (DataType::Bool, Value::Int64(i)) => Ok(Value::Bool(*i != 0)),
            (DataType::Bool, Value::Float64(f)) => Ok(Value::Bool(*f != 0.0)),
            (DataType::Bool, Value::Utf8(s)) => parse_bool(s.trim()).map(Value::Bool),

            (_, Value::Null) => Ok(Value::Null),
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Utf8(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Utf8(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Identifies a field in a source record.
///
/// Positional sources (delimited text, spreadsheets) key values by 0-based column ordinal;
/// named sources (JSON, Parquet, file listings) key them by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    /// 0-based column ordinal.
    Column(usize),
    /// Named field.
    Name(String),
}

impl FieldId {
    /// Column identifier from a spreadsheet letter name such as `"C"` or `"AB"`.
    pub fn letters(name: &str) -> EtlResult<Self> {
        column::to_ordinal(name).map(FieldId::Column)
    }

    /// Named field identifier.
    pub fn name(name: impl Into<String>) -> Self {
        FieldId::Name(name.into())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldId::Column(n) => f.write_str(&column::to_letters(*n)),
            FieldId::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for FieldId {
    fn from(n: usize) -> Self {
        FieldId::Column(n)
    }
}

impl From<&str> for FieldId {
    fn from(name: &str) -> Self {
        FieldId::Name(name.to_string())
    }
}

impl From<String> for FieldId {
    fn from(name: String) -> Self {
        FieldId::Name(name)
    }
}

/// Output fields of one record, keyed by destination field name.
pub type Fields = BTreeMap<String, Value>;

/// A physical row as produced by a row reader.
pub type Row = Vec<(FieldId, Value)>;

pub(crate) const NULL: &Value = &Value::Null;

/// One input record.
///
/// Raw values are fixed at creation; the blank flag is computed once from them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    raw: BTreeMap<FieldId, Value>,
    blank: bool,
    origin: Option<String>,
}

impl Record {
    /// Create a record from raw `(field, value)` pairs. Later duplicates replace earlier ones.
    pub fn new(raw: impl IntoIterator<Item = (FieldId, Value)>) -> Self {
        let raw: BTreeMap<FieldId, Value> = raw.into_iter().collect();
        let blank = raw.values().all(Value::is_empty);
        Self {
            raw,
            blank,
            origin: None,
        }
    }

    /// Attach provenance text (e.g. `row 42 in people.csv`).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Value of `field`, if the record has it.
    pub fn get(&self, field: &FieldId) -> Option<&Value> {
        self.raw.get(field)
    }

    /// True when every raw value is empty (or the record has no values at all).
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// Provenance text, once the record has been accepted by its extractor.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Iterate raw values in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &Value)> {
        self.raw.iter()
    }

    /// Number of raw values.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// True when the record carries no raw values.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
