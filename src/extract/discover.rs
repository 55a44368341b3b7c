//! Locating input files by pattern.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{EtlError, EtlResult};

/// Find the single regular file in `dir` whose name matches the glob `pattern`.
///
/// Only `dir` itself is searched (no recursion). Zero matches and multiple matches are both
/// errors, so a run never silently picks the wrong file.
pub fn find_one(dir: impl AsRef<Path>, pattern: &str) -> EtlResult<PathBuf> {
    let dir = dir.as_ref();
    let mut matches = find_all(dir, pattern)?;

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(EtlError::FileMatch {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
            message: "no matching file".to_string(),
        }),
        n => Err(EtlError::FileMatch {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
            message: format!(
                "{n} files match, expected one: {:?}",
                matches
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|f| f.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
            ),
        }),
    }
}

/// All regular files directly inside `dir` whose name matches `pattern`, sorted by path.
pub fn find_all(dir: impl AsRef<Path>, pattern: &str) -> EtlResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(EtlError::FileMatch {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
            message: "pattern must match file names, not paths".to_string(),
        });
    }
    if !dir.is_dir() {
        return Err(EtlError::open(dir, "not a directory"));
    }

    let full = format!(
        "{}/{}",
        Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut out = Vec::new();
    for entry in glob::glob_with(&full, options)? {
        let path = entry.map_err(|e| EtlError::Io(e.into_error()))?;
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
