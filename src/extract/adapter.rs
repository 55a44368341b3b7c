//! Shared record lifecycle for file-based sources.
//!
//! A [`FileSourceAdapter`] owns the state machine
//!
//! ```text
//! Unopened -> SkippingHeaders -> Active -> EndOfInput
//! ```
//!
//! and delegates the physical work to a [`RowReader`]: "open this file" and "give me the next
//! row". Header rows and blank rows are handled here once, so a reader never deals with them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::types::{FieldId, Record, Row};

use super::discover;
use super::Extract;

/// Reads physical rows from one file format.
pub trait RowReader {
    /// Open `path`. Errors are reported to the caller as [`EtlError::ResourceOpen`].
    fn open(&mut self, path: &Path) -> EtlResult<()>;

    /// Read the next physical row, or `None` at end of input. A row with no values (or only
    /// empty values) is a blank row; the adapter skips it.
    fn read_row(&mut self) -> EtlResult<Option<Row>>;

    /// Release the file. Must tolerate being called when `open` never succeeded.
    fn close(&mut self);

    /// Extra location detail appended to record origins (e.g. the sheet name).
    fn location(&self) -> Option<String> {
        None
    }
}

/// Where the adapter finds its input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A known path.
    Path(PathBuf),
    /// Exactly one file in `dir` whose name matches the glob `pattern`.
    Match { dir: PathBuf, pattern: String },
}

impl FileSource {
    /// Source for a known path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        FileSource::Path(path.into())
    }

    /// Source found by matching `pattern` inside `dir` when the adapter opens.
    pub fn matching(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        FileSource::Match {
            dir: dir.into(),
            pattern: pattern.into(),
        }
    }

    /// Resolve to a concrete path.
    pub fn resolve(&self) -> EtlResult<PathBuf> {
        match self {
            FileSource::Path(p) => Ok(p.clone()),
            FileSource::Match { dir, pattern } => discover::find_one(dir, pattern),
        }
    }
}

/// Options shared by every file-based source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Physical rows to discard before the first record.
    pub header_rows: usize,
    /// Take field names from the last header row, so columns can also be read by name.
    pub names_from_header: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    SkippingHeaders,
    Active,
    EndOfInput,
}

/// [`Extract`] implementation for file formats.
#[derive(Debug)]
pub struct FileSourceAdapter<R> {
    source: FileSource,
    options: FileOptions,
    reader: R,
    state: State,
    path: Option<PathBuf>,
    headers_skipped: usize,
    header_names: BTreeMap<FieldId, String>,
    position: usize,
    record_number: usize,
    current: Option<Record>,
}

impl<R: RowReader> FileSourceAdapter<R> {
    /// Wrap `reader` to read from `source` with default [`FileOptions`].
    pub fn new(source: FileSource, reader: R) -> Self {
        Self::with_options(source, reader, FileOptions::default())
    }

    /// Wrap `reader` to read from `source`.
    pub fn with_options(source: FileSource, reader: R, options: FileOptions) -> Self {
        Self {
            source,
            options,
            reader,
            state: State::Unopened,
            path: None,
            headers_skipped: 0,
            header_names: BTreeMap::new(),
            position: 0,
            record_number: 0,
            current: None,
        }
    }

    /// Set the number of header rows to skip.
    pub fn header_rows(mut self, n: usize) -> Self {
        self.options.header_rows = n;
        self
    }

    /// Expose columns under the names found in the last header row.
    pub fn names_from_header(mut self, yes: bool) -> Self {
        self.options.names_from_header = yes;
        self
    }

    /// Physical rows read so far, including headers and blank rows.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The resolved input path, once opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Field names captured from the header row.
    pub fn header_names(&self) -> &BTreeMap<FieldId, String> {
        &self.header_names
    }

    fn open(&mut self) -> EtlResult<()> {
        let path = self.source.resolve()?;
        if let Err(e) = self.reader.open(&path) {
            return Err(match e {
                e @ EtlError::ResourceOpen { .. } => e,
                other => EtlError::open(&path, other),
            });
        }
        debug!(path = %path.display(), header_rows = self.options.header_rows, "opened input file");
        self.path = Some(path);
        self.state = State::SkippingHeaders;
        Ok(())
    }

    fn skip_headers(&mut self) -> EtlResult<()> {
        while self.headers_skipped < self.options.header_rows {
            let Some(row) = self.reader.read_row()? else {
                debug!(skipped = self.headers_skipped, "input ended inside header rows");
                self.state = State::EndOfInput;
                return Ok(());
            };
            self.position += 1;
            self.headers_skipped += 1;

            if self.options.names_from_header && self.headers_skipped == self.options.header_rows {
                self.header_names = row
                    .into_iter()
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(id, v)| (id, v.to_string().trim().to_string()))
                    .collect();
            }
        }
        self.state = State::Active;
        Ok(())
    }

    fn read_active(&mut self) -> EtlResult<bool> {
        loop {
            let Some(row) = self.reader.read_row()? else {
                self.state = State::EndOfInput;
                self.current = None;
                return Ok(false);
            };
            self.position += 1;

            let named: Vec<_> = row
                .iter()
                .filter_map(|(id, v)| {
                    self.header_names
                        .get(id)
                        .map(|name| (FieldId::Name(name.clone()), v.clone()))
                })
                .collect();
            let record = Record::new(row.into_iter().chain(named));
            if record.is_blank() {
                continue;
            }

            self.record_number += 1;
            self.current = Some(record.with_origin(self.origin()));
            return Ok(true);
        }
    }

    fn origin(&self) -> String {
        let file = self
            .path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.reader.location() {
            Some(loc) => format!("row {} of {loc} in {file}", self.position),
            None => format!("row {} in {file}", self.position),
        }
    }
}

impl<R: RowReader> Extract for FileSourceAdapter<R> {
    fn setup(&mut self) -> EtlResult<()> {
        if self.state == State::Unopened {
            self.open()?;
        }
        Ok(())
    }

    fn next_record(&mut self) -> EtlResult<bool> {
        loop {
            match self.state {
                State::Unopened => self.open()?,
                State::SkippingHeaders => self.skip_headers()?,
                State::Active => return self.read_active(),
                State::EndOfInput => {
                    self.current = None;
                    return Ok(false);
                }
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
        self.state == State::EndOfInput
    }

    fn finished(&mut self) {
        self.reader.close();
        self.current = None;
        if self.state != State::Unopened {
            self.state = State::EndOfInput;
        }
    }

    fn describe(&self) -> String {
        match (&self.path, &self.source) {
            (Some(p), _) | (None, FileSource::Path(p)) => p.display().to_string(),
            (None, FileSource::Match { dir, pattern }) => format!("{pattern} in {}", dir.display()),
        }
    }
}
