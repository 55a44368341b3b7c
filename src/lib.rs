//! `etl-pipeline` is a small extract/transform/load engine: read records from a source, map their
//! fields into named output fields, and write them to a destination.
//!
//! The entrypoint is [`pipeline::Pipeline`]. Configure it with an extractor
//! ([`extract::Extract`]), a loader ([`load::Load`]), a field mapping and optional constant fields,
//! then call [`pipeline::Pipeline::run`]. The pipeline is empty again after every run.
//!
//! ## Sources
//!
//! File sources share one state machine ([`extract::FileSourceAdapter`]) that opens the file,
//! skips header rows, skips blank rows and counts records. The format is a pluggable
//! [`extract::RowReader`]:
//!
//! - **Delimited text**: `.csv`, `.tsv`, `.txt` ([`extract::DelimitedText`])
//! - **Spreadsheets** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`,
//!   `.ods` ([`extract::Spreadsheet`])
//! - **JSON**: `.json` (array of objects) and `.ndjson` ([`extract::JsonRows`])
//! - **Parquet**: `.parquet`, `.pq` ([`extract::ParquetRows`])
//!
//! [`extract::open_source`] picks the reader from the file extension. A file can also be located
//! by a glob pattern inside a directory ([`extract::FileSource::matching`]); exactly one file must
//! match. Other sources: [`extract::FileListing`] (one record per file under a directory) and
//! [`extract::MemoryRows`].
//!
//! Positional sources key fields by 0-based column; [`column`] converts to and from spreadsheet
//! letter names (`0 <-> "A"`, `26 <-> "AA"`).
//!
//! ## Destinations
//!
//! - [`load::HashLoader`]: keyed in-memory store; duplicate keys are kept, overwritten or skipped
//!   ([`load::DuplicatePolicy`])
//! - [`load::MemoryLoader`]: list of records
//! - [`load::SqlLoader`] (requires the Cargo feature `sql`): SQLite tables
//!
//! ## Quick example
//!
//! ```no_run
//! use etl_pipeline::extract::DelimitedText;
//! use etl_pipeline::load::{DuplicatePolicy, HashLoader};
//! use etl_pipeline::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), etl_pipeline::EtlError> {
//! let mut people = HashLoader::new("Name").duplicates(DuplicatePolicy::Overwrite);
//!
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .extract(DelimitedText::from_path("people.csv").header_rows(1))
//!     .load(&mut people)
//!     .map("Name", 0)
//!     .map("Age", 1)
//!     .constant("Source", "import");
//! let report = pipeline.run()?;
//! drop(pipeline);
//!
//! println!("read={} written={}", report.records_read, report.records_written);
//! println!("{}", people.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Runs can report to a [`pipeline::PipelineObserver`] (stderr, `tracing`, an append-only log
//! file, or several at once). Failed runs are classified by [`pipeline::Severity`]; failures at or
//! above the configured threshold also trigger `on_alert`.
//!
//! ## Modules
//!
//! - [`pipeline`]: the engine, run reports and observers
//! - [`extract`]: sources and the file source state machine
//! - [`load`]: destinations and write outcomes
//! - [`types`]: values, field identifiers and records
//! - [`column`]: column ordinal / letter name conversion
//! - [`error`]: error types used across the crate

pub mod column;
pub mod error;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod types;

pub use error::{EtlError, EtlResult};
