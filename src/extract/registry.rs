//! Choosing a file reader by format name or extension.
//!
//! Most callers should use [`open_source`], which returns a boxed [`Extract`] for a file.
//!
//! - If [`SourceOptions::format`] is `None`, the format is inferred from the file extension
//!   (for [`FileSource::Match`], from the extension in the pattern).
//! - [`SourceFormat`] also parses from names such as `"csv"` or `"excel"`, so formats can come
//!   from configuration text.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{EtlError, EtlResult};

use super::adapter::{FileOptions, FileSource};
use super::delimited::{DelimitedOptions, DelimitedText};
use super::json::JsonRows;
use super::parquet::ParquetRows;
use super::Extract;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Comma/tab/otherwise separated values.
    DelimitedText,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Spreadsheet,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl SourceFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" | "psv" => Some(Self::DelimitedText),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Infer the format of `path` from its extension.
    pub fn infer(path: &Path) -> EtlResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                EtlError::config(format!(
                    "cannot infer format: path has no extension ({})",
                    path.display()
                ))
            })?;

        Self::from_extension(ext).ok_or_else(|| {
            EtlError::config(format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ))
        })
    }
}

impl FromStr for SourceFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delimitedtext" | "delimited" | "csv" | "tsv" => Ok(Self::DelimitedText),
            "spreadsheet" | "excel" | "xlsx" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "json" | "ndjson" => Ok(Self::Json),
            "parquet" => Ok(Self::Parquet),
            other => Err(EtlError::config(format!("unknown source format '{other}'"))),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DelimitedText => "delimited text",
            Self::Spreadsheet => "spreadsheet",
            Self::Json => "json",
            Self::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

/// Which worksheet a spreadsheet source reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SheetSelection {
    /// The first sheet (default).
    #[default]
    First,
    /// A sheet by name.
    Named(String),
    /// A sheet by 0-based position.
    Index(usize),
}

/// Options for [`open_source`].
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    /// If `None`, infer the format from the file extension.
    pub format: Option<SourceFormat>,
    /// Header and naming options shared by all formats.
    pub file: FileOptions,
    /// Delimited-text tokenizer options.
    pub delimited: DelimitedOptions,
    /// Spreadsheet sheet choice.
    pub sheet: SheetSelection,
}

/// Build an extractor for `source`.
///
/// # Examples
///
/// ```no_run
/// use etl_pipeline::extract::{open_source, Extract, FileSource, SourceOptions};
/// use etl_pipeline::types::FieldId;
///
/// # fn main() -> Result<(), etl_pipeline::EtlError> {
/// let mut opts = SourceOptions::default();
/// opts.file.header_rows = 1;
///
/// // Picks the delimited-text reader from the `.csv` extension.
/// let mut input = open_source(FileSource::path("people.csv"), &opts)?;
/// while input.next_record()? {
///     println!("{}", input.get(&FieldId::Column(0)));
/// }
/// input.finished();
/// # Ok(())
/// # }
/// ```
pub fn open_source(source: FileSource, options: &SourceOptions) -> EtlResult<Box<dyn Extract>> {
    let format = match options.format {
        Some(f) => f,
        None => match &source {
            FileSource::Path(p) => SourceFormat::infer(p)?,
            FileSource::Match { pattern, .. } => SourceFormat::infer(Path::new(pattern))?,
        },
    };

    let file = options.file.clone();
    let extract: Box<dyn Extract> = match format {
        SourceFormat::DelimitedText => Box::new(DelimitedText::source(source, options.delimited, file)),
        SourceFormat::Json => Box::new(JsonRows::source(source, file)),
        SourceFormat::Parquet => Box::new(ParquetRows::source(source, file)),
        SourceFormat::Spreadsheet => spreadsheet_source(source, &options.sheet, file)?,
    };
    Ok(extract)
}

fn spreadsheet_source(
    source: FileSource,
    sheet: &SheetSelection,
    file: FileOptions,
) -> EtlResult<Box<dyn Extract>> {
    #[cfg(feature = "excel")]
    {
        use super::spreadsheet::Spreadsheet;

        Ok(Box::new(Spreadsheet::source(source, sheet.clone(), file)))
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (source, sheet, file);
        Err(EtlError::config(
            "spreadsheet sources not enabled (enable cargo feature 'excel')",
        ))
    }
}
