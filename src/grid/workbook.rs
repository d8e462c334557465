use crate::grid::coord::{CellRef, RangeRef};
use crate::grid::formula;
use crate::grid::sheet::{Cell, Sheet};
use crate::utils::error::{ReportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    /// Values, formulas (relative references shifted) and styles.
    All,
    /// Cached values only; the destination keeps its own style.
    Values,
}

/// 剪貼簿內容：來源範圍與相對位置的儲存格
#[derive(Debug, Clone)]
struct Clipboard {
    origin: RangeRef,
    cells: Vec<(u32, u32, Cell)>,
}

/// 一次執行的活頁簿工作階段。
///
/// Holds the named sheets and the single clipboard shared by every copy and
/// paste. Dropping the workbook releases everything; there is no global handle.
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    clipboard: Option<Clipboard>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self {
            sheets,
            clipboard: None,
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|sheet| sheet.name() == name)
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name() == name)
            .ok_or_else(|| ReportError::SheetNotFound {
                name: name.to_string(),
            })
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|sheet| sheet.name() == name)
            .ok_or_else(|| ReportError::SheetNotFound {
                name: name.to_string(),
            })
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<&mut Sheet> {
        if self.has_sheet(name) {
            return Err(ReportError::SheetExists {
                name: name.to_string(),
            });
        }
        self.sheets.push(Sheet::new(name));
        let index = self.sheets.len() - 1;
        Ok(&mut self.sheets[index])
    }

    pub fn remove_sheet(&mut self, name: &str) -> Result<Sheet> {
        let index = self
            .sheets
            .iter()
            .position(|sheet| sheet.name() == name)
            .ok_or_else(|| ReportError::SheetNotFound {
                name: name.to_string(),
            })?;
        Ok(self.sheets.remove(index))
    }

    pub fn copy(&mut self, sheet: &str, range: &RangeRef) -> Result<()> {
        let source = self.sheet(sheet)?;
        let cells = source
            .cells_in(range)
            .map(|(cell, value)| {
                (
                    cell.row - range.start.row,
                    cell.col - range.start.col,
                    value.clone(),
                )
            })
            .collect();

        self.clipboard = Some(Clipboard {
            origin: *range,
            cells,
        });
        Ok(())
    }

    /// Pastes the clipboard with its top-left corner at `at`, replacing whatever
    /// the destination area held. Returns the destination range.
    pub fn paste(&mut self, sheet: &str, at: CellRef, mode: PasteMode) -> Result<RangeRef> {
        let clipboard = self.clipboard.clone().ok_or(ReportError::ClipboardEmpty)?;
        let origin = clipboard.origin;
        let destination = RangeRef::new(
            at,
            CellRef::new(
                at.row + origin.row_count() - 1,
                at.col + origin.col_count() - 1,
            ),
        );
        let row_delta = at.row as i64 - origin.start.row as i64;
        let col_delta = at.col as i64 - origin.start.col as i64;

        let target = self.sheet_mut(sheet)?;
        let previous: Vec<(CellRef, Cell)> = target
            .cells_in(&destination)
            .map(|(cell, value)| (cell, value.clone()))
            .collect();
        for (cell, _) in &previous {
            target.remove(*cell);
        }

        for (row_offset, col_offset, source) in clipboard.cells {
            let cell = CellRef::new(at.row + row_offset, at.col + col_offset);
            let pasted = match mode {
                PasteMode::All => {
                    let mut pasted = source;
                    pasted.formula = pasted
                        .formula
                        .map(|f| formula::shift_references(&f, row_delta, col_delta));
                    pasted
                }
                PasteMode::Values => {
                    let style = previous
                        .iter()
                        .find(|(existing, _)| *existing == cell)
                        .map(|(_, existing)| existing.style.clone())
                        .unwrap_or_default();
                    Cell {
                        value: source.value,
                        formula: None,
                        text: source.text,
                        style,
                    }
                }
            };
            target.set(cell, pasted);
        }

        Ok(destination)
    }

    pub fn clear_clipboard(&mut self) {
        self.clipboard = None;
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// 將範圍內公式轉為數值 (copy + paste values over itself)
    pub fn materialize(&mut self, sheet: &str, range: &RangeRef) -> Result<()> {
        let result = self
            .copy(sheet, range)
            .and_then(|_| self.paste(sheet, range.start, PasteMode::Values));
        self.clear_clipboard();
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::sheet::{CellStyle, CellValue};

    fn source_workbook() -> Workbook {
        let mut sheet = Sheet::new("source");
        sheet.set(CellRef::parse("P11").unwrap(), Cell::number(1.0));
        sheet.set(CellRef::parse("P12").unwrap(), Cell::number(2.0));
        sheet.set(
            CellRef::parse("Q12").unwrap(),
            Cell::number(3.0)
                .with_formula("=P11+P12")
                .with_style(CellStyle {
                    bold: true,
                    ..Default::default()
                }),
        );
        Workbook::from_sheets(vec![sheet])
    }

    #[test]
    fn test_sheet_lookup_and_management() {
        let mut workbook = source_workbook();
        assert!(workbook.sheet("source").is_ok());
        assert!(matches!(
            workbook.sheet("missing"),
            Err(ReportError::SheetNotFound { .. })
        ));

        workbook.add_sheet("TempData").unwrap();
        assert!(matches!(
            workbook.add_sheet("TempData"),
            Err(ReportError::SheetExists { .. })
        ));
        workbook.remove_sheet("TempData").unwrap();
        assert_eq!(workbook.sheet_names(), vec!["source"]);
    }

    #[test]
    fn test_paste_all_shifts_formulas() {
        let mut workbook = source_workbook();
        workbook.add_sheet("scratch").unwrap();
        workbook
            .copy("source", &RangeRef::parse("P11:Q12").unwrap())
            .unwrap();
        let pasted = workbook
            .paste("scratch", CellRef::new(1, 1), PasteMode::All)
            .unwrap();

        assert_eq!(pasted.to_string(), "A1:B2");
        let cell = workbook.sheet("scratch").unwrap().get(CellRef::new(2, 2)).unwrap();
        assert_eq!(cell.formula.as_deref(), Some("=A1+A2"));
        assert!(cell.style.bold);
    }

    #[test]
    fn test_materialize_drops_formulas_keeps_values() {
        let mut workbook = source_workbook();
        let range = RangeRef::parse("P11:Q12").unwrap();
        workbook.materialize("source", &range).unwrap();

        let sheet = workbook.sheet("source").unwrap();
        assert_eq!(sheet.formula_count(), 0);
        let cell = sheet.get(CellRef::parse("Q12").unwrap()).unwrap();
        assert_eq!(cell.value, CellValue::Number(3.0));
        assert!(cell.style.bold);
        assert!(!workbook.has_clipboard());
    }

    #[test]
    fn test_paste_without_copy_fails() {
        let mut workbook = source_workbook();
        assert!(matches!(
            workbook.paste("source", CellRef::new(1, 1), PasteMode::All),
            Err(ReportError::ClipboardEmpty)
        ));
    }
}
