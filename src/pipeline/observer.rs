use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EtlError;

use super::{RecordFailure, RunReport};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the run failed).
    Error,
    /// Critical error (typically I/O or an input/destination that cannot be opened).
    Critical,
}

impl Severity {
    /// Severity of a fatal run error.
    pub fn of(error: &EtlError) -> Self {
        match error {
            EtlError::Io(_) | EtlError::ResourceOpen { .. } | EtlError::Walk(_) => Severity::Critical,
            EtlError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Severity::Critical,
                _ => Severity::Error,
            },
            _ => Severity::Error,
        }
    }
}

/// Context about a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Description of the extractor.
    pub source: String,
    /// Description of the loader.
    pub destination: String,
}

/// Observer interface for pipeline runs.
///
/// Implementors can record metrics, logs, or trigger alerts. Every method has a no-op default.
pub trait PipelineObserver: Send + Sync {
    /// Called after validation, before the source is set up.
    fn on_run_started(&self, _ctx: &RunContext) {}

    /// Called for each record the destination did not write.
    fn on_record_failed(&self, _ctx: &RunContext, _failure: &RecordFailure) {}

    /// Called when the run completes.
    fn on_success(&self, _ctx: &RunContext, _report: &RunReport) {}

    /// Called when the run fails.
    fn on_failure(&self, _ctx: &RunContext, _severity: Severity, _error: &EtlError) {}

    /// Called when a run failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &EtlError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans every callback out to a list of observers, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Composite over `observers`.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_run_started(&self, ctx: &RunContext) {
        self.observers.iter().for_each(|o| o.on_run_started(ctx));
    }

    fn on_record_failed(&self, ctx: &RunContext, failure: &RecordFailure) {
        self.observers.iter().for_each(|o| o.on_record_failed(ctx, failure));
    }

    fn on_success(&self, ctx: &RunContext, report: &RunReport) {
        self.observers.iter().for_each(|o| o.on_success(ctx, report));
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &EtlError) {
        self.observers.iter().for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &EtlError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }
}

/// A run event rendered as one `key=value` line.
#[derive(Debug, Clone, Copy)]
enum EventLine<'a> {
    Record(&'a RunContext, &'a RecordFailure),
    Success(&'a RunContext, &'a RunReport),
    Failure(&'a RunContext, Severity, &'a EtlError),
    Alert(&'a RunContext, Severity, &'a EtlError),
}

impl fmt::Display for EventLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EventLine::Record(ctx, failure) => write!(f, "record source={} {failure}", ctx.source),
            EventLine::Success(ctx, report) => write!(
                f,
                "ok source={} destination={} read={} written={} failed={}",
                ctx.source,
                ctx.destination,
                report.records_read,
                report.records_written,
                report.failures.len()
            ),
            EventLine::Failure(ctx, severity, error) => write!(
                f,
                "fail severity={severity:?} source={} destination={} err={error}",
                ctx.source, ctx.destination
            ),
            EventLine::Alert(ctx, severity, error) => write!(
                f,
                "ALERT severity={severity:?} source={} destination={} err={error}",
                ctx.source, ctx.destination
            ),
        }
    }
}

/// Where a [`LineObserver`] sends its rendered lines.
pub trait LineSink: Send + Sync {
    /// Write one complete line (no trailing newline). Failures are the sink's to swallow.
    fn write_line(&self, line: &str);
}

/// Observer that renders each event as a single line and passes it to a [`LineSink`].
///
/// Run start is not logged; record failures, run success, run failure and alerts are.
#[derive(Debug, Default)]
pub struct LineObserver<S> {
    sink: S,
}

impl<S: LineSink> LineObserver<S> {
    /// Observer writing to `sink`.
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn emit(&self, line: EventLine<'_>) {
        self.sink.write_line(&line.to_string());
    }
}

impl<S: LineSink> PipelineObserver for LineObserver<S> {
    fn on_record_failed(&self, ctx: &RunContext, failure: &RecordFailure) {
        self.emit(EventLine::Record(ctx, failure));
    }

    fn on_success(&self, ctx: &RunContext, report: &RunReport) {
        self.emit(EventLine::Success(ctx, report));
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &EtlError) {
        self.emit(EventLine::Failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &EtlError) {
        self.emit(EventLine::Alert(ctx, severity, error));
    }
}

/// Lines go to stderr with an `[etl]` prefix.
#[derive(Debug, Default)]
pub struct StdErrSink;

impl LineSink for StdErrSink {
    fn write_line(&self, line: &str) {
        eprintln!("[etl] {line}");
    }
}

/// Lines are appended to a log file, prefixed with a Unix timestamp in seconds.
///
/// The file is opened on the first line and kept open. Open and write errors are ignored; after a
/// failed write the next line reopens the file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Sink appending to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for FileSink {
    fn write_line(&self, line: &str) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if guard.is_none() {
            *guard = OpenOptions::new().create(true).append(true).open(&self.path).ok();
        }
        let written = guard
            .as_mut()
            .map(|f| writeln!(f, "{} {line}", unix_ts()).is_ok());
        if written == Some(false) {
            *guard = None;
        }
    }
}

/// Logs run events to stderr.
pub type StdErrObserver = LineObserver<StdErrSink>;

/// Appends run events to a local log file.
pub type FileObserver = LineObserver<FileSink>;

impl FileObserver {
    /// Observer appending to the log file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_sink(FileSink::new(path))
    }
}

/// Forwards run events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_run_started(&self, ctx: &RunContext) {
        tracing::info!(source = %ctx.source, destination = %ctx.destination, "run started");
    }

    fn on_record_failed(&self, ctx: &RunContext, failure: &RecordFailure) {
        tracing::warn!(
            source = %ctx.source,
            record = failure.record_number,
            origin = failure.origin.as_deref().unwrap_or(""),
            outcome = %failure.outcome,
            "record not written"
        );
    }

    fn on_success(&self, ctx: &RunContext, report: &RunReport) {
        tracing::info!(
            source = %ctx.source,
            destination = %ctx.destination,
            read = report.records_read,
            written = report.records_written,
            failed = report.failures.len(),
            "run finished"
        );
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &EtlError) {
        tracing::error!(source = %ctx.source, destination = %ctx.destination, ?severity, %error, "run failed");
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{LineObserver, LineSink, PipelineObserver, RunContext, Severity};
    use crate::error::EtlError;
    use crate::load::WriteOutcome;
    use crate::pipeline::{RecordFailure, RunReport};

    #[derive(Default)]
    struct Captured(Mutex<Vec<String>>);

    impl LineSink for Captured {
        fn write_line(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn ctx() -> RunContext {
        RunContext {
            source: "people.csv".into(),
            destination: "hash store".into(),
        }
    }

    #[test]
    fn every_event_renders_one_line() {
        let obs = LineObserver::with_sink(Captured::default());
        let failure = RecordFailure {
            record_number: 3,
            origin: Some("row 4 in people.csv".into()),
            outcome: WriteOutcome::Failed("bad age".into()),
        };
        let report = RunReport {
            records_read: 4,
            records_written: 3,
            failures: vec![failure.clone()],
        };
        let error = EtlError::config("no mapping");

        obs.on_run_started(&ctx());
        obs.on_record_failed(&ctx(), &failure);
        obs.on_success(&ctx(), &report);
        obs.on_failure(&ctx(), Severity::Error, &error);
        obs.on_alert(&ctx(), Severity::Critical, &error);

        let lines = obs.sink().0.lock().unwrap().clone();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "record source=people.csv record 3 (row 4 in people.csv): failed: bad age"
        );
        assert_eq!(
            lines[1],
            "ok source=people.csv destination=hash store read=4 written=3 failed=1"
        );
        assert!(lines[2].starts_with("fail severity=Error source=people.csv destination=hash store err="));
        assert!(lines[2].contains("no mapping"));
        assert!(lines[3].starts_with("ALERT severity=Critical "));
    }
}
