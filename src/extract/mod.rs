//! Input sources.
//!
//! Every source implements [`Extract`]. File-based formats plug a [`RowReader`] into the shared
//! [`FileSourceAdapter`], which handles opening, header rows and blank rows; sources that are
//! not files ([`FileListing`], [`MemoryRows`]) implement the contract directly.
//!
//! Most callers pick a file source through [`open_source`] (from [`registry`]), which infers the
//! format from the file extension unless one is given in [`SourceOptions`].

pub mod adapter;
pub mod delimited;
pub mod discover;
pub mod json;
pub mod listing;
pub mod memory;
pub mod parquet;
pub mod registry;
#[cfg(feature = "excel")]
pub mod spreadsheet;

use crate::error::EtlResult;
use crate::types::{FieldId, Record, Value, NULL};

pub use adapter::{FileOptions, FileSource, FileSourceAdapter, RowReader};
pub use delimited::{DelimitedOptions, DelimitedText};
pub use json::JsonRows;
pub use listing::{FileListing, ListingOptions};
pub use memory::MemoryRows;
pub use self::parquet::ParquetRows;
pub use registry::{open_source, SheetSelection, SourceFormat, SourceOptions};
#[cfg(feature = "excel")]
pub use spreadsheet::Spreadsheet;

/// Capabilities every input source provides.
pub trait Extract {
    /// Prepare the source (open files, walk directories). Calling it twice is harmless.
    fn setup(&mut self) -> EtlResult<()>;

    /// Advance to the next record. Returns `false` once the input is exhausted.
    fn next_record(&mut self) -> EtlResult<bool>;

    /// The current record, if `next_record` last returned `true`.
    fn record(&self) -> Option<&Record>;

    /// 1-based count of records returned so far.
    fn record_number(&self) -> usize;

    /// True once `next_record` has returned `false`. Never resets.
    fn end_of_input(&self) -> bool;

    /// Release the underlying resource. Safe to call without a successful `setup`.
    fn finished(&mut self);

    /// Short human-readable description of the source, for diagnostics.
    fn describe(&self) -> String;

    /// Raw value of `field` in the current record, or `Null` when it is absent.
    fn get(&self, field: &FieldId) -> &Value {
        self.record().and_then(|r| r.get(field)).unwrap_or(NULL)
    }
}

impl<E: Extract + ?Sized> Extract for &mut E {
    fn setup(&mut self) -> EtlResult<()> {
        (**self).setup()
    }

    fn next_record(&mut self) -> EtlResult<bool> {
        (**self).next_record()
    }

    fn record(&self) -> Option<&Record> {
        (**self).record()
    }

    fn record_number(&self) -> usize {
        (**self).record_number()
    }

    fn end_of_input(&self) -> bool {
        (**self).end_of_input()
    }

    fn finished(&mut self) {
        (**self).finished()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn get(&self, field: &FieldId) -> &Value {
        (**self).get(field)
    }
}

impl<E: Extract + ?Sized> Extract for Box<E> {
    fn setup(&mut self) -> EtlResult<()> {
        (**self).setup()
    }

    fn next_record(&mut self) -> EtlResult<bool> {
        (**self).next_record()
    }

    fn record(&self) -> Option<&Record> {
        (**self).record()
    }

    fn record_number(&self) -> usize {
        (**self).record_number()
    }

    fn end_of_input(&self) -> bool {
        (**self).end_of_input()
    }

    fn finished(&mut self) {
        (**self).finished()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn get(&self, field: &FieldId) -> &Value {
        (**self).get(field)
    }
}
