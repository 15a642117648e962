//! A1 notation helpers
//!
//! Converts between spreadsheet column letters and 0-based column indexes.

use crate::error::{Result, StoreError};

/// 0-based index of an A1 column identifier (`"A"` → 0, `"G"` → 6, `"AA"` → 26).
///
/// Lowercase letters are accepted. Returns `None` for empty or non-alphabetic input.
pub fn column_index(column: &str) -> Option<usize> {
    if column.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for ch in column.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// A1 column identifier for a 0-based index (0 → `"A"`, 26 → `"AA"`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse a column range like `"A:G"` into inclusive 0-based bounds.
pub fn parse_column_range(range: &str) -> Result<(usize, usize)> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| StoreError::InvalidAddress(format!("expected COL:COL, got {range:?}")))?;
    let start = column_index(start.trim())
        .ok_or_else(|| StoreError::InvalidAddress(format!("bad start column in {range:?}")))?;
    let end = column_index(end.trim())
        .ok_or_else(|| StoreError::InvalidAddress(format!("bad end column in {range:?}")))?;
    if start > end {
        return Err(StoreError::InvalidAddress(format!(
            "range {range:?} ends before it starts"
        )));
    }
    Ok((start, end))
}
