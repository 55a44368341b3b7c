//! The pipeline engine.
//!
//! A [`Pipeline`] holds the configuration for one run: an extractor, a loader, the field
//! mapping and constant fields. [`Pipeline::run`] drives
//!
//! 1. `extract.setup()`, `load.setup(extract)`
//! 2. for every record: constants, then mapped fields, then `load.write_record(n)`
//! 3. `extract.finished()`, `load.finished()` (always, once setup was attempted)
//!
//! and then leaves the pipeline empty again, whether the run succeeded or not.
//!
//! ```rust
//! use etl_pipeline::extract::MemoryRows;
//! use etl_pipeline::load::HashLoader;
//! use etl_pipeline::pipeline::Pipeline;
//! use etl_pipeline::types::Value;
//!
//! # fn main() -> Result<(), etl_pipeline::EtlError> {
//! let mut store = HashLoader::new("Name");
//!
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .extract(MemoryRows::new(vec![vec!["Ada", "36"], vec!["Grace", "45"]]))
//!     .load(&mut store)
//!     .map("Name", 0)
//!     .map("Age", 1)
//!     .constant("Source", "import");
//! let report = pipeline.run()?;
//! drop(pipeline);
//!
//! assert_eq!(report.records_written, 2);
//! let ada = &store.get("Ada").unwrap().records()[0];
//! assert_eq!(ada["Source"], Value::from("import"));
//! # Ok(())
//! # }
//! ```

mod observer;
mod transform;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::extract::Extract;
use crate::load::{Load, WriteOutcome};
use crate::types::{FieldId, Value};

pub use observer::{
    CompositeObserver, FileObserver, FileSink, LineObserver, LineSink, PipelineObserver, RunContext, Severity,
    StdErrObserver, StdErrSink, TracingObserver,
};

/// Computes a mapped field from the current extractor.
pub type ExtractFn<'a> = Box<dyn Fn(&dyn Extract) -> Value + 'a>;

/// Computes a constant field from the active loader.
pub type LoadFn<'a> = Box<dyn Fn(&dyn Load) -> Value + 'a>;

/// Source of a mapped destination field.
pub enum Mapping<'a> {
    /// Copy a raw field from the current record.
    Field(FieldId),
    /// Compute the value from the extractor.
    Compute(ExtractFn<'a>),
}

impl fmt::Debug for Mapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Field(id) => f.debug_tuple("Field").field(id).finish(),
            Mapping::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// Value of a constant destination field.
pub enum Constant<'a> {
    /// A fixed value.
    Value(Value),
    /// Compute the value from the loader.
    Compute(LoadFn<'a>),
}

impl fmt::Debug for Constant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Constant::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// A record the destination did not write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Source record number (1-based).
    pub record_number: usize,
    /// Where the record came from, if the extractor recorded it.
    pub origin: Option<String>,
    /// What the destination reported.
    pub outcome: WriteOutcome,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "record {} ({origin}): {}", self.record_number, self.outcome),
            None => write!(f, "record {}: {}", self.record_number, self.outcome),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records returned by the extractor.
    pub records_read: usize,
    /// Records the loader reported as written.
    pub records_written: usize,
    /// Records the loader skipped or rejected, in order.
    pub failures: Vec<RecordFailure>,
}

/// Configuration and driver for one extract/transform/load run.
///
/// Components can be owned or lent: pass `&mut loader` to keep using the loader after the run
/// (drop or stop using the pipeline first).
pub struct Pipeline<'a> {
    extract: Option<Box<dyn Extract + 'a>>,
    load: Option<Box<dyn Load + 'a>>,
    mapping: BTreeMap<String, Mapping<'a>>,
    constants: BTreeMap<String, Constant<'a>>,
    observer: Option<Arc<dyn PipelineObserver>>,
    alert_at_or_above: Severity,
}

impl Default for Pipeline<'_> {
    fn default() -> Self {
        Self {
            extract: None,
            load: None,
            mapping: BTreeMap::new(),
            constants: BTreeMap::new(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

impl fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("extract", &self.extract.as_ref().map(|e| e.describe()))
            .field("load", &self.load.as_ref().map(|l| l.describe()))
            .field("mapping", &self.mapping)
            .field("constants", &self.constants)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl<'a> Pipeline<'a> {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the extractor for the next run.
    pub fn extract(&mut self, extract: impl Extract + 'a) -> &mut Self {
        self.extract = Some(Box::new(extract));
        self
    }

    /// Set the loader for the next run.
    pub fn load(&mut self, load: impl Load + 'a) -> &mut Self {
        self.load = Some(Box::new(load));
        self
    }

    /// Copy source field `source` into destination field `field`.
    pub fn map(&mut self, field: impl Into<String>, source: impl Into<FieldId>) -> &mut Self {
        self.mapping.insert(field.into(), Mapping::Field(source.into()));
        self
    }

    /// Compute destination field `field` from the extractor.
    pub fn map_with<F>(&mut self, field: impl Into<String>, compute: F) -> &mut Self
    where
        F: Fn(&dyn Extract) -> Value + 'a,
    {
        self.mapping.insert(field.into(), Mapping::Compute(Box::new(compute)));
        self
    }

    /// Give destination field `field` a fixed value. A mapping for the same field wins.
    pub fn constant(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.constants.insert(field.into(), Constant::Value(value.into()));
        self
    }

    /// Compute destination field `field` from the loader. A mapping for the same field wins.
    pub fn constant_with<F>(&mut self, field: impl Into<String>, compute: F) -> &mut Self
    where
        F: Fn(&dyn Load) -> Value + 'a,
    {
        self.constants.insert(field.into(), Constant::Compute(Box::new(compute)));
        self
    }

    /// Attach an observer. Unlike the run configuration, it stays across runs.
    pub fn observer(&mut self, observer: Arc<dyn PipelineObserver>) -> &mut Self {
        self.observer = Some(observer);
        self
    }

    /// Severity at which `on_alert` is invoked (default [`Severity::Critical`]).
    pub fn alert_at_or_above(&mut self, severity: Severity) -> &mut Self {
        self.alert_at_or_above = severity;
        self
    }

    /// True if any run configuration (extractor, loader, mapping, constants) is set.
    pub fn is_configured(&self) -> bool {
        self.extract.is_some()
            || self.load.is_some()
            || !self.mapping.is_empty()
            || !self.constants.is_empty()
    }

    /// Execute one run.
    ///
    /// Fails before touching any input if the extractor, the loader or the field mapping is
    /// missing. Records the loader does not write are collected in the [`RunReport`]; only
    /// setup, read and close errors fail the run. The run configuration is cleared in every
    /// case.
    pub fn run(&mut self) -> EtlResult<RunReport> {
        let extract = self.extract.take();
        let load = self.load.take();
        let mapping = std::mem::take(&mut self.mapping);
        let constants = std::mem::take(&mut self.constants);

        let ctx = RunContext {
            source: extract.as_ref().map(|e| e.describe()).unwrap_or_default(),
            destination: load.as_ref().map(|l| l.describe()).unwrap_or_default(),
        };
        let observer = self.observer.as_deref();

        let result = match (extract, load) {
            (None, _) => Err(EtlError::config("no extractor configured")),
            (_, None) => Err(EtlError::config("no loader configured")),
            (Some(_), Some(_)) if mapping.is_empty() => Err(EtlError::config("no field mapping configured")),
            (Some(mut extract), Some(mut load)) => {
                if let Some(obs) = observer {
                    obs.on_run_started(&ctx);
                }
                execute(&mut *extract, &mut *load, &mapping, &constants, observer, &ctx)
            }
        };

        if let Some(obs) = observer {
            match &result {
                Ok(report) => obs.on_success(&ctx, report),
                Err(e) => {
                    let sev = Severity::of(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }
}

fn execute<'a>(
    extract: &mut (dyn Extract + 'a),
    load: &mut (dyn Load + 'a),
    mapping: &BTreeMap<String, Mapping<'a>>,
    constants: &BTreeMap<String, Constant<'a>>,
    observer: Option<&dyn PipelineObserver>,
    ctx: &RunContext,
) -> EtlResult<RunReport> {
    let mut report = RunReport::default();
    let result = drive(extract, load, mapping, constants, observer, ctx, &mut report);

    extract.finished();
    let closed = load.finished();
    result?;
    closed?;

    debug!(
        read = report.records_read,
        written = report.records_written,
        failed = report.failures.len(),
        "run complete"
    );
    Ok(report)
}

fn drive<'a>(
    extract: &mut (dyn Extract + 'a),
    load: &mut (dyn Load + 'a),
    mapping: &BTreeMap<String, Mapping<'a>>,
    constants: &BTreeMap<String, Constant<'a>>,
    observer: Option<&dyn PipelineObserver>,
    ctx: &RunContext,
    report: &mut RunReport,
) -> EtlResult<()> {
    extract.setup()?;
    load.setup(&*extract)?;

    while extract.next_record()? {
        transform::apply(&*extract, &mut *load, mapping, constants);

        let record_number = extract.record_number();
        let outcome = load.write_record(record_number);
        report.records_read += 1;
        report.records_written += outcome.count();

        if outcome != WriteOutcome::Written {
            let failure = RecordFailure {
                record_number,
                origin: extract.record().and_then(|r| r.origin()).map(str::to_string),
                outcome,
            };
            if let Some(obs) = observer {
                obs.on_record_failed(ctx, &failure);
            }
            report.failures.push(failure);
        }
    }
    Ok(())
}
