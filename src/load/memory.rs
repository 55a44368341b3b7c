//! List store.

use crate::error::EtlResult;
use crate::extract::Extract;
use crate::types::{Fields, Value};

use super::{Load, WriteOutcome};

/// [`Load`] that appends every record to a list, in arrival order.
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    records: Vec<Fields>,
    buffer: Fields,
    clear: bool,
    written: usize,
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            buffer: Fields::new(),
            clear: true,
            written: 0,
        }
    }
}

impl MemoryLoader {
    /// Empty list that is cleared at every `setup`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change whether `setup` empties the list.
    pub fn clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// Stored records.
    pub fn records(&self) -> &[Fields] {
        &self.records
    }

    /// Take the stored records out of the loader.
    pub fn into_records(self) -> Vec<Fields> {
        self.records
    }
}

impl Load for MemoryLoader {
    fn setup(&mut self, _extract: &dyn Extract) -> EtlResult<()> {
        if self.clear {
            self.records.clear();
        }
        self.buffer.clear();
        Ok(())
    }

    fn set(&mut self, field: &str, value: Value) {
        self.buffer.insert(field.to_string(), value);
    }

    fn write_record(&mut self, _record_number: usize) -> WriteOutcome {
        self.records.push(std::mem::take(&mut self.buffer));
        self.written += 1;
        WriteOutcome::Written
    }

    fn records_written(&self) -> usize {
        self.written
    }

    fn finished(&mut self) -> EtlResult<()> {
        self.buffer.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory list".to_string()
    }
}
