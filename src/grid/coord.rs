use crate::utils::error::{ReportError, Result};
use std::fmt;

/// 欄位字母轉欄號 (A=1, Z=26, AA=27)
pub fn column_label_to_index(label: &str) -> Result<u32> {
    if label.is_empty() {
        return Err(ReportError::InvalidLabel {
            label: label.to_string(),
        });
    }

    let mut index: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ReportError::InvalidLabel {
                label: label.to_string(),
            });
        }
        let digit = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| ReportError::InvalidLabel {
                label: label.to_string(),
            })?;
    }

    Ok(index)
}

/// 欄號轉欄位字母
pub fn index_to_column_label(index: u32) -> Result<String> {
    if index < 1 {
        return Err(ReportError::InvalidIndex {
            index: index as i64,
        });
    }

    let mut remaining = index;
    let mut letters = Vec::new();
    while remaining > 0 {
        remaining -= 1;
        letters.push((b'A' + (remaining % 26) as u8) as char);
        remaining /= 26;
    }

    Ok(letters.into_iter().rev().collect())
}

/// 依月份計算結束欄位 (1月: +1, 2月: +2 ...)
pub fn end_column(start_label: &str, month_offset: u32) -> Result<String> {
    let start = column_label_to_index(start_label)?;
    let end = start
        .checked_add(month_offset)
        .ok_or(ReportError::InvalidIndex {
            index: start as i64 + month_offset as i64,
        })?;
    index_to_column_label(end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parses `Q50` or `$Q$50`.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || ReportError::InvalidReference {
            reference: reference.to_string(),
        };

        let cleaned: String = reference.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);

        let col = column_label_to_index(letters).map_err(|_| invalid())?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Ok(Self { row, col })
    }

    pub fn column_label(&self) -> String {
        index_to_column_label(self.col).unwrap_or_default()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_label(), self.row)
    }
}

/// 矩形範圍，start 永遠在左上、end 在右下
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// `P11:T41`; a single cell (`A1`) is a one-cell range.
    pub fn parse(range: &str) -> Result<Self> {
        match range.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellRef::parse(a)?, CellRef::parse(b)?)),
            None => {
                let cell = CellRef::parse(range)?;
                Ok(Self::new(cell, cell))
            }
        }
    }

    /// Range spanning columns `start_col..=end_col` over rows `start_row..=end_row`.
    pub fn from_columns(start_col: &str, end_col: &str, start_row: u32, end_row: u32) -> Result<Self> {
        let a = column_label_to_index(start_col)?;
        let b = column_label_to_index(end_col)?;
        if start_row == 0 || end_row == 0 {
            return Err(ReportError::InvalidReference {
                reference: format!("{}{}:{}{}", start_col, start_row, end_col, end_row),
            });
        }
        Ok(Self::new(CellRef::new(start_row, a), CellRef::new(end_row, b)))
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Same columns, different rows.
    pub fn with_rows(&self, start_row: u32, end_row: u32) -> Self {
        Self::new(
            CellRef::new(start_row, self.start.col),
            CellRef::new(end_row, self.end.col),
        )
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
