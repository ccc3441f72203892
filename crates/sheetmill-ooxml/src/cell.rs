//! A1-style cell references

use std::fmt;
use std::str::FromStr;

use crate::error::{OoxmlError, Result};

/// Last column Excel accepts (XFD), 0-indexed
pub const MAX_COLUMN: u32 = 16_383;
/// Last row Excel accepts, 0-indexed
pub const MAX_ROW: u32 = 1_048_575;

/// A cell position, 0-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    /// Parse a reference like `B2` (case-insensitive, `$` markers allowed)
    pub fn parse(cell: &str) -> Result<Self> {
        let trimmed = cell.trim();
        let invalid = || OoxmlError::InvalidCellRef(trimmed.to_string());

        let cleaned: String = trimmed.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = column_to_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row - 1 > MAX_ROW {
            return Err(invalid());
        }

        Ok(Self { row: row - 1, col })
    }

    /// 1-based row number as written in `<row r="..">`
    pub fn row_number(&self) -> u32 {
        self.row + 1
    }

    pub fn column_name(&self) -> String {
        index_to_column(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_column(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = OoxmlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Convert column letters to 0-indexed number (A=0, B=1, ..., Z=25, AA=26)
pub fn column_to_index(col: &str) -> Option<u32> {
    let mut result: u32 = 0;
    for c in col.chars() {
        let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        result = result.checked_mul(26)?.checked_add(value)?;
        if result > MAX_COLUMN + 1 {
            return None;
        }
    }
    result.checked_sub(1)
}

/// Convert a 0-indexed column number to letters (0=A, 26=AA)
pub fn index_to_column(mut index: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}
