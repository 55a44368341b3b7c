//! Delimited text (CSV, TSV, …) rows.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::EtlResult;
use crate::types::{FieldId, Row, Value};

use super::adapter::{FileOptions, FileSource, FileSourceAdapter, RowReader};

/// Tokenizer settings for delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedOptions {
    /// Field separator (default `,`).
    pub delimiter: u8,
    /// Quote character (default `"`).
    pub quote: u8,
    /// Trim surrounding whitespace from every field.
    pub trim: bool,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            trim: false,
        }
    }
}

/// [`RowReader`] for delimited text files, backed by the `csv` crate.
///
/// Fields are keyed by 0-based column ordinal. Header handling is left to the adapter, so the
/// underlying reader never treats the first line specially. Rows may have different lengths.
///
/// The `csv` tokenizer drops empty lines. They still count as physical rows here: each one is
/// returned as an empty row before the record that follows it.
#[derive(Debug, Default)]
pub struct DelimitedText {
    options: DelimitedOptions,
    reader: Option<csv::Reader<File>>,
    buf: csv::StringRecord,
    scout: Option<LineScout>,
    empty_lines: u64,
    held: Option<Row>,
}

impl DelimitedText {
    /// Reader with the given tokenizer options.
    pub fn new(options: DelimitedOptions) -> Self {
        Self {
            options,
            reader: None,
            buf: csv::StringRecord::new(),
            scout: None,
            empty_lines: 0,
            held: None,
        }
    }

    /// Adapter reading comma-separated `path` with default options.
    pub fn from_path(path: impl AsRef<Path>) -> FileSourceAdapter<Self> {
        FileSourceAdapter::new(FileSource::path(path.as_ref()), Self::default())
    }

    /// Adapter reading `source` with explicit tokenizer and file options.
    pub fn source(
        source: FileSource,
        options: DelimitedOptions,
        file: FileOptions,
    ) -> FileSourceAdapter<Self> {
        FileSourceAdapter::with_options(source, Self::new(options), file)
    }
}

impl RowReader for DelimitedText {
    fn open(&mut self, path: &Path) -> EtlResult<()> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_path(path)?;
        self.reader = Some(reader);
        self.scout = Some(LineScout::open(path)?);
        self.empty_lines = 0;
        self.held = None;
        Ok(())
    }

    fn read_row(&mut self) -> EtlResult<Option<Row>> {
        if self.empty_lines > 0 {
            self.empty_lines -= 1;
            return Ok(Some(Row::new()));
        }
        if let Some(row) = self.held.take() {
            return Ok(Some(row));
        }
        let (Some(reader), Some(scout)) = (self.reader.as_mut(), self.scout.as_mut()) else {
            return Ok(None);
        };

        let start = reader.position().byte();
        let row = if reader.read_record(&mut self.buf)? {
            Some(
                self.buf
                    .iter()
                    .enumerate()
                    .map(|(i, field)| (FieldId::Column(i), Value::text(field)))
                    .collect(),
            )
        } else {
            None
        };

        let skipped = scout.empty_lines_at(start)?;
        if skipped == 0 {
            return Ok(row);
        }
        self.empty_lines = skipped - 1;
        self.held = row;
        Ok(Some(Row::new()))
    }

    fn close(&mut self) {
        self.reader = None;
        self.scout = None;
        self.empty_lines = 0;
        self.held = None;
    }
}

/// Second read-only cursor over the input, used to count the empty lines the tokenizer skipped
/// in front of a record. It only moves forward by small steps, so it stays inside its buffer.
#[derive(Debug)]
struct LineScout {
    file: BufReader<File>,
    pos: u64,
}

impl LineScout {
    fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: BufReader::new(File::open(path)?),
            pos: 0,
        })
    }

    fn seek_to(&mut self, at: u64) -> io::Result<()> {
        self.file.seek_relative(at as i64 - self.pos as i64)?;
        self.pos = at;
        Ok(())
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.file.fill_buf()?.first().copied())
    }

    fn bump(&mut self, n: usize) {
        self.file.consume(n);
        self.pos += n as u64;
    }

    /// Number of empty lines starting at byte offset `at`, where the previous record (if any)
    /// ended. A `\n` completing the previous record's `\r\n` is not a line of its own.
    fn empty_lines_at(&mut self, at: u64) -> io::Result<u64> {
        let mut prev = None;
        if at == 0 {
            self.seek_to(0)?;
            if self.file.fill_buf()?.starts_with(b"\xef\xbb\xbf") {
                self.bump(3);
            }
        } else {
            self.seek_to(at - 1)?;
            prev = self.peek()?;
            self.bump(1);
        }

        let mut lines = 0;
        while let Some(b @ (b'\r' | b'\n')) = self.peek()? {
            if b == b'\r' || prev != Some(b'\r') {
                lines += 1;
            }
            prev = Some(b);
            self.bump(1);
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::DelimitedText;
    use crate::extract::RowReader;

    fn tmp_file(name: &str, text: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("etl-pipeline-{name}-{nanos}.csv"));
        std::fs::write(&path, text).unwrap();
        path
    }

    fn widths(text: &str) -> Vec<usize> {
        let path = tmp_file("widths", text);
        let mut reader = DelimitedText::default();
        reader.open(&path).unwrap();
        let mut out = Vec::new();
        while let Some(row) = reader.read_row().unwrap() {
            out.push(row.len());
        }
        reader.close();
        let _ = std::fs::remove_file(&path);
        out
    }

    #[test]
    fn empty_lines_are_returned_as_empty_rows() {
        assert_eq!(widths("a,b\n\nc,d\n"), vec![2, 0, 2]);
        assert_eq!(widths("\n\na\n"), vec![0, 0, 1]);
        assert_eq!(widths("a\n\n\n"), vec![1, 0, 0]);
        assert_eq!(widths("a\nb"), vec![1, 1]);
    }

    #[test]
    fn crlf_and_bare_cr_line_endings() {
        assert_eq!(widths("a,b\r\n\r\nc,d\r\n"), vec![2, 0, 2]);
        assert_eq!(widths("a\r\rb\r"), vec![1, 0, 1]);
    }

    #[test]
    fn quoted_newlines_stay_inside_the_field() {
        assert_eq!(widths("\"x\n\ny\",1\n\nz,2\n"), vec![2, 0, 2]);
    }

    #[test]
    fn byte_order_mark_is_not_a_line() {
        assert_eq!(widths("\u{feff}\na\n"), vec![0, 1]);
    }
}
