//! Keyed in-memory store.
//!
//! [`HashLoader`] files each record under the value of one key field. When a key repeats, the
//! configured [`DuplicatePolicy`] decides what happens:
//!
//! | policy      | store after R1 then R2 with the same key | second write |
//! |-------------|------------------------------------------|--------------|
//! | `Keep`      | `Many([R1, R2])`                         | written      |
//! | `Overwrite` | `One(R2)`                                | written      |
//! | `Skip`      | `One(R1)`                                | skipped      |

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EtlError, EtlResult};
use crate::extract::Extract;
use crate::types::{Fields, Value};

use super::{Load, WriteOutcome};

/// How [`HashLoader`] handles a second record with an existing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Collect every record for the key, in arrival order.
    #[default]
    Keep,
    /// Replace the stored record with the newest one.
    Overwrite,
    /// Keep the first record and discard later ones.
    Skip,
}

impl FromStr for DuplicatePolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            other => Err(EtlError::config(format!(
                "unknown duplicate policy '{other}' (expected keep, overwrite or skip)"
            ))),
        }
    }
}

/// Options for [`HashLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct HashOptions {
    /// Duplicate-key handling.
    pub duplicates: DuplicatePolicy,
    /// Empty the store at `setup`. Turn off to accumulate across runs.
    pub clear: bool,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::Keep,
            clear: true,
        }
    }
}

/// Records stored under one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoreEntry {
    /// A single record (overwrite and skip policies).
    One(Fields),
    /// Records in arrival order (keep policy).
    Many(Vec<Fields>),
}

impl StoreEntry {
    /// All records under the key, in arrival order.
    pub fn records(&self) -> &[Fields] {
        match self {
            StoreEntry::One(r) => std::slice::from_ref(r),
            StoreEntry::Many(rs) => rs,
        }
    }

    fn push(&mut self, record: Fields) {
        match self {
            StoreEntry::Many(rs) => rs.push(record),
            StoreEntry::One(first) => {
                let first = std::mem::take(first);
                *self = StoreEntry::Many(vec![first, record]);
            }
        }
    }
}

/// [`Load`] into a map from key value to records.
///
/// The key value is the text form of the record's key field. Records whose key field is
/// missing or empty cannot be filed; they are kept in [`HashLoader::unkeyed`] and reported as
/// skipped.
#[derive(Debug, Clone)]
pub struct HashLoader {
    key: String,
    options: HashOptions,
    store: BTreeMap<String, StoreEntry>,
    unkeyed: Vec<Fields>,
    buffer: Fields,
    written: usize,
}

impl HashLoader {
    /// Store keyed on `key` with default options (keep duplicates, clear at setup).
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_options(key, HashOptions::default())
    }

    /// Store keyed on `key`.
    pub fn with_options(key: impl Into<String>, options: HashOptions) -> Self {
        Self {
            key: key.into(),
            options,
            store: BTreeMap::new(),
            unkeyed: Vec::new(),
            buffer: Fields::new(),
            written: 0,
        }
    }

    /// Change the duplicate policy.
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.options.duplicates = policy;
        self
    }

    /// Change whether `setup` empties the store.
    pub fn clear(mut self, clear: bool) -> Self {
        self.options.clear = clear;
        self
    }

    /// Key field name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The whole store.
    pub fn store(&self) -> &BTreeMap<String, StoreEntry> {
        &self.store
    }

    /// Entry for one key value.
    pub fn get(&self, key: &str) -> Option<&StoreEntry> {
        self.store.get(key)
    }

    /// Records that had no usable key.
    pub fn unkeyed(&self) -> &[Fields] {
        &self.unkeyed
    }

    /// Take the store out of the loader.
    pub fn into_store(self) -> BTreeMap<String, StoreEntry> {
        self.store
    }

    /// The store as JSON (`{"key": {...}}` or `{"key": [{...}, ...]}`).
    pub fn to_json(&self) -> EtlResult<String> {
        Ok(serde_json::to_string_pretty(&self.store)?)
    }

    fn file(&mut self, key: String, record: Fields) -> WriteOutcome {
        match self.options.duplicates {
            DuplicatePolicy::Keep => match self.store.get_mut(&key) {
                Some(entry) => entry.push(record),
                None => {
                    self.store.insert(key, StoreEntry::Many(vec![record]));
                }
            },
            DuplicatePolicy::Overwrite => {
                self.store.insert(key, StoreEntry::One(record));
            }
            DuplicatePolicy::Skip => {
                if self.store.contains_key(&key) {
                    return WriteOutcome::Skipped(format!("duplicate key '{key}'"));
                }
                self.store.insert(key, StoreEntry::One(record));
            }
        }
        WriteOutcome::Written
    }
}

impl Load for HashLoader {
    fn setup(&mut self, _extract: &dyn Extract) -> EtlResult<()> {
        if self.key.trim().is_empty() {
            return Err(EtlError::config("hash store needs a key field name"));
        }
        if self.options.clear {
            self.store.clear();
            self.unkeyed.clear();
        }
        self.buffer.clear();
        debug!(key = %self.key, policy = ?self.options.duplicates, clear = self.options.clear, "hash store ready");
        Ok(())
    }

    fn set(&mut self, field: &str, value: Value) {
        self.buffer.insert(field.to_string(), value);
    }

    fn write_record(&mut self, record_number: usize) -> WriteOutcome {
        let record = std::mem::take(&mut self.buffer);
        let key = match record.get(&self.key) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                warn!(record_number, key = %self.key, "record has no key value");
                self.unkeyed.push(record);
                return WriteOutcome::Skipped(format!("no value for key field '{}'", self.key));
            }
        };

        let outcome = self.file(key, record);
        self.written += outcome.count();
        outcome
    }

    fn records_written(&self) -> usize {
        self.written
    }

    fn finished(&mut self) -> EtlResult<()> {
        self.buffer.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("hash store keyed on '{}'", self.key)
    }
}
