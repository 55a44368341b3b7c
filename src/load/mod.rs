//! Output destinations.
//!
//! Every destination implements [`Load`]. The pipeline fills a loader's in-progress record with
//! [`Load::set`] and commits it with [`Load::write_record`], which reports a [`WriteOutcome`]
//! instead of an error so that one bad record does not stop a batch.
//!
//! - [`HashLoader`]: keyed in-memory store with a configurable [`DuplicatePolicy`]
//! - [`MemoryLoader`]: every record appended to a list
//! - [`SqlLoader`]: SQL tables through SQLite (feature `sql`)

pub mod hash;
pub mod memory;
#[cfg(feature = "sql")]
pub mod sql;

use std::fmt;

use crate::error::EtlResult;
use crate::extract::Extract;
use crate::types::Value;

pub use hash::{DuplicatePolicy, HashLoader, HashOptions, StoreEntry};
pub use memory::MemoryLoader;
#[cfg(feature = "sql")]
pub use sql::{SqlConnect, SqlLoader, SqlOptions, SqlTable};

/// Result of committing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was stored.
    Written,
    /// The destination deliberately discarded the record (e.g. a duplicate key under
    /// [`DuplicatePolicy::Skip`]).
    Skipped(String),
    /// The destination rejected the record (e.g. a constraint violation).
    Failed(String),
}

impl WriteOutcome {
    /// Records written: 1 for [`WriteOutcome::Written`], otherwise 0.
    pub fn count(&self) -> usize {
        match self {
            WriteOutcome::Written => 1,
            WriteOutcome::Skipped(_) | WriteOutcome::Failed(_) => 0,
        }
    }

    /// Reason text for records that were not written.
    pub fn reason(&self) -> Option<&str> {
        match self {
            WriteOutcome::Written => None,
            WriteOutcome::Skipped(r) | WriteOutcome::Failed(r) => Some(r),
        }
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Written => f.write_str("written"),
            WriteOutcome::Skipped(r) => write!(f, "skipped: {r}"),
            WriteOutcome::Failed(r) => write!(f, "failed: {r}"),
        }
    }
}

/// Capabilities every output destination provides.
pub trait Load {
    /// Prepare the destination. `extract` is the source paired with it for this run.
    fn setup(&mut self, extract: &dyn Extract) -> EtlResult<()>;

    /// Store one field in the in-progress record. Setting a field twice keeps the last value.
    fn set(&mut self, field: &str, value: Value);

    /// Commit the in-progress record and start a fresh, empty one.
    ///
    /// `record_number` is the source record number, for diagnostics.
    fn write_record(&mut self, record_number: usize) -> WriteOutcome;

    /// Records written since the loader was created.
    fn records_written(&self) -> usize;

    /// Flush and close the destination.
    fn finished(&mut self) -> EtlResult<()>;

    /// Short human-readable description of the destination, for diagnostics.
    fn describe(&self) -> String;
}

impl<L: Load + ?Sized> Load for &mut L {
    fn setup(&mut self, extract: &dyn Extract) -> EtlResult<()> {
        (**self).setup(extract)
    }

    fn set(&mut self, field: &str, value: Value) {
        (**self).set(field, value)
    }

    fn write_record(&mut self, record_number: usize) -> WriteOutcome {
        (**self).write_record(record_number)
    }

    fn records_written(&self) -> usize {
        (**self).records_written()
    }

    fn finished(&mut self) -> EtlResult<()> {
        (**self).finished()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<L: Load + ?Sized> Load for Box<L> {
    fn setup(&mut self, extract: &dyn Extract) -> EtlResult<()> {
        (**self).setup(extract)
    }

    fn set(&mut self, field: &str, value: Value) {
        (**self).set(field, value)
    }

    fn write_record(&mut self, record_number: usize) -> WriteOutcome {
        (**self).write_record(record_number)
    }

    fn records_written(&self) -> usize {
        (**self).records_written()
    }

    fn finished(&mut self) -> EtlResult<()> {
        (**self).finished()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
