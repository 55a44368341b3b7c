//! File listings as records.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{EtlError, EtlResult};
use crate::types::{FieldId, Record, Value};

use super::Extract;

/// Options for [`FileListing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOptions {
    /// Glob matched against each file name (default `*`).
    pub pattern: String,
    /// Maximum directory depth; `Some(1)` lists only the top directory. `None` is unlimited.
    pub max_depth: Option<usize>,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            max_depth: Some(1),
        }
    }
}

/// One record per regular file found under a directory.
///
/// Fields (all [`FieldId::Name`]):
///
/// - `path`: full path
/// - `relative`: path relative to the listing root
/// - `file`: file name
/// - `stem`: file name without extension
/// - `extension`: extension without the dot (Null if none)
/// - `directory`: parent directory
/// - `size`: size in bytes
///
/// Files are listed in file-name order within each directory.
#[derive(Debug)]
pub struct FileListing {
    root: PathBuf,
    options: ListingOptions,
    pending: Option<VecDeque<Record>>,
    current: Option<Record>,
    record_number: usize,
    done: bool,
}

impl FileListing {
    /// List `*` directly inside `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, ListingOptions::default())
    }

    /// List `root` with explicit options.
    pub fn with_options(root: impl Into<PathBuf>, options: ListingOptions) -> Self {
        Self {
            root: root.into(),
            options,
            pending: None,
            current: None,
            record_number: 0,
            done: false,
        }
    }

    fn scan(&self) -> EtlResult<VecDeque<Record>> {
        if !self.root.is_dir() {
            return Err(EtlError::open(&self.root, "not a directory"));
        }
        let pattern = Pattern::new(&self.options.pattern)?;

        let mut walker = WalkDir::new(&self.root).min_depth(1).sort_by_file_name();
        if let Some(depth) = self.options.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut out = VecDeque::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !pattern.matches(&name) {
                continue;
            }
            let size = entry.metadata()?.len();
            let origin = entry.path().display().to_string();
            out.push_back(Record::new(file_fields(&self.root, entry.path(), name, size)).with_origin(origin));
        }
        debug!(root = %self.root.display(), files = out.len(), "listed files");
        Ok(out)
    }
}

fn file_fields(root: &Path, path: &Path, name: String, size: u64) -> Vec<(FieldId, Value)> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let text = |p: Option<&std::ffi::OsStr>| Value::from(p.map(|s| s.to_string_lossy().into_owned()));
    vec![
        (FieldId::name("path"), Value::from(path.display().to_string())),
        (FieldId::name("relative"), Value::from(relative.display().to_string())),
        (FieldId::name("file"), Value::from(name)),
        (FieldId::name("stem"), text(path.file_stem())),
        (FieldId::name("extension"), text(path.extension())),
        (
            FieldId::name("directory"),
            Value::from(path.parent().map(|p| p.display().to_string())),
        ),
        (FieldId::name("size"), Value::Int64(i64::try_from(size).unwrap_or(i64::MAX))),
    ]
}

impl Extract for FileListing {
    fn setup(&mut self) -> EtlResult<()> {
        if self.pending.is_none() && !self.done {
            self.pending = Some(self.scan()?);
        }
        Ok(())
    }

    fn next_record(&mut self) -> EtlResult<bool> {
        self.setup()?;
        match self.pending.as_mut().and_then(VecDeque::pop_front) {
            Some(record) => {
                self.record_number += 1;
                self.current = Some(record);
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
        self.pending = None;
        self.current = None;
    }

    fn describe(&self) -> String {
        format!("{} in {}", self.options.pattern, self.root.display())
    }
}
