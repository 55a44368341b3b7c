//! In-memory rows.

use std::collections::VecDeque;

use crate::error::EtlResult;
use crate::types::{FieldId, Record, Value};

use super::Extract;

/// Extractor over rows held in memory.
///
/// Rows are returned as given, blank ones included; there is no file and so no header or
/// blank-row handling.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    pending: VecDeque<Record>,
    current: Option<Record>,
    record_number: usize,
    done: bool,
}

impl MemoryRows {
    /// Positional rows: each value is keyed by its 0-based column.
    pub fn new<I, R, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::from_records(rows.into_iter().map(|row| {
            Record::new(
                row.into_iter()
                    .enumerate()
                    .map(|(i, v)| (FieldId::Column(i), v.into())),
            )
        }))
    }

    /// Named rows: each `(name, value)` pair becomes a [`FieldId::Name`] field.
    pub fn named<I, R, K, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_records(rows.into_iter().map(|row| {
            Record::new(
                row.into_iter()
                    .map(|(k, v)| (FieldId::Name(k.into()), v.into())),
            )
        }))
    }

    /// Ready-made records.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            pending: records.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Records not yet returned.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Extract for MemoryRows {
    fn setup(&mut self) -> EtlResult<()> {
        Ok(())
    }

    fn next_record(&mut self) -> EtlResult<bool> {
        match self.pending.pop_front() {
            Some(record) => {
                self.record_number += 1;
                let origin = format!("record {} in memory", self.record_number);
                self.current = Some(record.with_origin(origin));
                Ok(true)
            }
            None => {
                self.current = None;
                self.done = true;
                Ok(false)
            }
        }
    }

    fn record(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    fn record_number(&self) -> usize {
        self.record_number
    }

    fn end_of_input(&self) -> bool {
        self.done
    }

    fn finished(&mut self) {
        self.current = None;
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
