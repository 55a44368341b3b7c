//! Spreadsheet column names.
//!
//! Spreadsheets show columns as `A`, `B`, … `Z`, `AA`, `AB`, … which is a bijective base-26
//! numbering: there is no zero digit, so each step subtracts one before dividing.
//! Ordinals here are 0-based (`0 → "A"`).

use crate::error::{EtlError, EtlResult};

const RADIX: usize = 26;

/// Convert a 0-based column ordinal into its letter name.
///
/// ```rust
/// use etl_pipeline::column::to_letters;
///
/// assert_eq!(to_letters(0), "A");
/// assert_eq!(to_letters(26), "AA");
/// assert_eq!(to_letters(701), "ZZ");
/// ```
pub fn to_letters(ordinal: usize) -> String {
    let mut letters = Vec::new();
    let mut n = ordinal;
    loop {
        letters.push(b'A' + (n % RADIX) as u8);
        if n < RADIX {
            break;
        }
        n = n / RADIX - 1;
    }
    letters.reverse();
    letters.into_iter().map(char::from).collect()
}

/// Convert a column name (or a cell reference like `B12`) into its 0-based ordinal.
///
/// Letters are case-insensitive and trailing row digits are ignored.
///
/// ```rust
/// use etl_pipeline::column::to_ordinal;
///
/// assert_eq!(to_ordinal("a").unwrap(), 0);
/// assert_eq!(to_ordinal("AB12").unwrap(), 27);
/// assert!(to_ordinal("12").is_err());
/// ```
pub fn to_ordinal(name: &str) -> EtlResult<usize> {
    let trimmed = name.trim();
    let letters = trimmed.trim_end_matches(|c: char| c.is_ascii_digit());
    if letters.is_empty() {
        return Err(invalid(name, "no column letters"));
    }

    // Accumulate the 0-based ordinal directly so the largest name still fits.
    let mut ordinal: Option<usize> = None;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(invalid(name, "expected letters followed by an optional row number"));
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize;
        ordinal = Some(match ordinal {
            None => digit,
            Some(n) => n
                .checked_mul(RADIX)
                .and_then(|v| v.checked_add(RADIX + digit))
                .ok_or_else(|| invalid(name, "column out of range"))?,
        });
    }
    ordinal.ok_or_else(|| invalid(name, "no column letters"))
}

fn invalid(input: &str, message: &str) -> EtlError {
    EtlError::InvalidColumn {
        input: input.to_string(),
        message: message.to_string(),
    }
}
