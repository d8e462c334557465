use crate::domain::ports::GridReader;
use crate::grid::coord::{CellRef, RangeRef};
use crate::grid::formula;
use crate::utils::error::ReadFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Error(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    /// General number format: integers without decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Text(s) | CellValue::Error(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
    /// Display text as the host renders it; `None` falls back to the general format.
    pub text: Option<String>,
    pub style: CellStyle,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn number(value: f64) -> Self {
        Self::new(CellValue::Number(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(CellValue::Text(value.into()))
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_display(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn display_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.value.to_string(),
        }
    }

    pub fn has_content(&self) -> bool {
        !self.value.is_empty() || self.formula.is_some() || self.text.is_some()
    }
}

/// 工作表：以 (列, 欄) 排序的稀疏儲存格
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellRef, Cell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, cell: CellRef) -> Option<&Cell> {
        self.cells.get(&cell)
    }

    pub fn set(&mut self, cell: CellRef, value: Cell) {
        self.cells.insert(cell, value);
    }

    pub fn remove(&mut self, cell: CellRef) -> Option<Cell> {
        self.cells.remove(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells inside `range`, row by row.
    pub fn cells_in<'a>(&'a self, range: &RangeRef) -> impl Iterator<Item = (CellRef, &'a Cell)> + 'a {
        let range = *range;
        let lower = CellRef::new(range.start.row, 0);
        let upper = CellRef::new(range.end.row, u32::MAX);
        self.cells
            .range(lower..=upper)
            .filter(move |(cell, _)| range.contains(**cell))
            .map(|(cell, value)| (*cell, value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().map(|(cell, value)| (*cell, value))
    }

    /// Bounding range of all cells with content.
    pub fn used_range(&self) -> Option<RangeRef> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (cell, value) in &self.cells {
            if !value.has_content() {
                continue;
            }
            bounds = Some(match bounds {
                None => (cell.row, cell.col, cell.row, cell.col),
                Some((r0, c0, r1, c1)) => (
                    r0.min(cell.row),
                    c0.min(cell.col),
                    r1.max(cell.row),
                    c1.max(cell.col),
                ),
            });
        }
        bounds.map(|(r0, c0, r1, c1)| RangeRef::new(CellRef::new(r0, c0), CellRef::new(r1, c1)))
    }

    /// Deletes rows `start..=end`; rows below move up and same-sheet formula
    /// references are adjusted. Formulas left pointing at deleted rows carry `#REF!`.
    pub fn delete_rows(&mut self, start: u32, end: u32) {
        if start == 0 || start > end {
            return;
        }
        let removed = end - start + 1;
        let cells = std::mem::take(&mut self.cells);

        for (cell, mut value) in cells {
            if (start..=end).contains(&cell.row) {
                continue;
            }
            if let Some(text) = value.formula.take() {
                let adjusted = formula::adjust_for_deleted_rows(&text, start, end);
                if formula::has_ref_error(&adjusted) {
                    value.value = CellValue::Error(formula::REF_ERROR.to_string());
                    value.text = Some(formula::REF_ERROR.to_string());
                }
                value.formula = Some(adjusted);
            }
            let target = if cell.row > end {
                CellRef::new(cell.row - removed, cell.col)
            } else {
                cell
            };
            self.cells.insert(target, value);
        }
    }

    pub fn formula_count(&self) -> usize {
        self.cells.values().filter(|cell| cell.formula.is_some()).count()
    }

    fn check_bounds(&self, cell: CellRef) -> Result<(), ReadFailure> {
        if cell.row == 0 || cell.col == 0 || cell.row > MAX_ROWS || cell.col > MAX_COLS {
            return Err(ReadFailure::OutOfBounds {
                sheet: self.name.clone(),
                reference: format!("R{}C{}", cell.row, cell.col),
            });
        }
        Ok(())
    }
}

impl GridReader for Sheet {
    fn name(&self) -> &str {
        &self.name
    }

    /// Excel `Find` 順序：從左上角的下一格開始逐列搜尋，左上角最後才比對
    fn find_row(&self, text: &str, window: &RangeRef) -> Result<Option<u32>, ReadFailure> {
        self.check_bounds(window.end)?;
        let corner = window.start;
        let matches = |cell: &Cell| cell.display_text().contains(text);
        let row = self
            .cells_in(window)
            .filter(|(cell, _)| *cell != corner)
            .find(|(_, cell)| matches(cell))
            .map(|(cell, _)| cell.row)
            .or_else(|| self.get(corner).filter(|cell| matches(cell)).map(|_| corner.row));
        Ok(row)
    }

    fn value_at(&self, cell: CellRef) -> Result<CellValue, ReadFailure> {
        self.check_bounds(cell)?;
        Ok(self.get(cell).map(|c| c.value.clone()).unwrap_or_default())
    }

    fn text_at(&self, cell: CellRef) -> Result<String, ReadFailure> {
        self.check_bounds(cell)?;
        Ok(self.get(cell).map(Cell::display_text).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_with_column(values: &[(u32, &str)]) -> Sheet {
        let mut sheet = Sheet::new("test");
        for (row, text) in values {
            sheet.set(CellRef::new(*row, 1), Cell::text(*text));
        }
        sheet
    }

    #[test]
    fn test_find_row_row_major_partial_match() {
        let mut sheet = sheet_with_column(&[(3, "月目標數"), (8, "累積月目標數")]);
        sheet.set(CellRef::new(2, 5), Cell::text("說明: 月目標數"));
        let window = RangeRef::parse("A1:Z100").unwrap();

        assert_eq!(sheet.find_row("月目標數", &window).unwrap(), Some(2));
        assert_eq!(sheet.find_row("累積月目標數", &window).unwrap(), Some(8));
        assert_eq!(sheet.find_row("不存在", &window).unwrap(), None);
    }

    #[test]
    fn test_find_row_checks_window_corner_last() {
        let mut sheet = sheet_with_column(&[(1, "月目標數"), (9, "月目標數")]);
        let window = RangeRef::parse("A1:Z100").unwrap();
        assert_eq!(sheet.find_row("月目標數", &window).unwrap(), Some(9));

        sheet.set(CellRef::new(9, 1), Cell::text("其他"));
        assert_eq!(sheet.find_row("月目標數", &window).unwrap(), Some(1));
    }

    #[test]
    fn test_find_row_respects_window() {
        let sheet = sheet_with_column(&[(150, "月目標數")]);
        let window = RangeRef::parse("A1:Z100").unwrap();
        assert_eq!(sheet.find_row("月目標數", &window).unwrap(), None);
    }

    #[test]
    fn test_value_and_text_accessors() {
        let mut sheet = Sheet::new("test");
        sheet.set(
            CellRef::new(5, 17),
            Cell::number(0.834).with_display("83.4%"),
        );

        assert_eq!(
            sheet.value_at(CellRef::new(5, 17)).unwrap(),
            CellValue::Number(0.834)
        );
        assert_eq!(sheet.text_at(CellRef::new(5, 17)).unwrap(), "83.4%");
        assert_eq!(sheet.text_at(CellRef::new(6, 17)).unwrap(), "");
        assert!(sheet.value_at(CellRef::new(0, 1)).is_err());
    }

    #[test]
    fn test_delete_rows_shifts_and_marks_ref_errors() {
        let mut sheet = Sheet::new("test");
        for row in 1..=6 {
            sheet.set(CellRef::new(row, 1), Cell::number(row as f64));
        }
        sheet.set(CellRef::new(6, 2), Cell::number(7.0).with_formula("=A1+A6"));
        sheet.set(CellRef::new(1, 2), Cell::number(3.0).with_formula("=A3"));

        sheet.delete_rows(3, 4);

        assert_eq!(sheet.get(CellRef::new(3, 1)).unwrap().value, CellValue::Number(5.0));
        assert_eq!(sheet.get(CellRef::new(4, 2)).unwrap().formula.as_deref(), Some("=A1+A4"));
        let broken = sheet.get(CellRef::new(1, 2)).unwrap();
        assert_eq!(broken.value, CellValue::Error("#REF!".to_string()));
        assert_eq!(sheet.used_range().unwrap().to_string(), "A1:B4");
    }

    #[test]
    fn test_general_display() {
        assert_eq!(CellValue::Number(1234.0).to_string(), "1234");
        assert_eq!(CellValue::Number(0.5).to_string(), "0.5");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }
}
