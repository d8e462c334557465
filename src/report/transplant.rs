//! 表格搬移：複製來源範圍、公式轉數值、刪除指定列，產出可插入文件的區塊。

use crate::domain::model::Block;
use crate::grid::{Cell, CellRef, PasteMode, RangeRef, Sheet, Workbook};
use crate::utils::error::{ReportError, Result};

/// 暫存工作表名稱；同一時間只會有一張
pub const SCRATCH_SHEET: &str = "TempData";

/// Removes the scratch sheet and empties the clipboard when dropped.
struct ScratchSheet<'a> {
    workbook: &'a mut Workbook,
}

impl<'a> ScratchSheet<'a> {
    fn create(workbook: &'a mut Workbook) -> Result<Self> {
        workbook.add_sheet(SCRATCH_SHEET)?;
        tracing::debug!("Created scratch sheet '{}'", SCRATCH_SHEET);
        Ok(Self { workbook })
    }
}

impl Drop for ScratchSheet<'_> {
    fn drop(&mut self) {
        self.workbook.clear_clipboard();
        if let Err(e) = self.workbook.remove_sheet(SCRATCH_SHEET) {
            tracing::warn!("Failed to remove scratch sheet: {}", e);
        }
    }
}

fn read_block(sheet: &Sheet, area: Option<RangeRef>, source: RangeRef) -> Block {
    let rows = match area {
        Some(area) => (area.start.row..=area.end.row)
            .map(|row| {
                (area.start.col..=area.end.col)
                    .map(|col| sheet.get(CellRef::new(row, col)).cloned().unwrap_or_default())
                    .collect::<Vec<Cell>>()
            })
            .collect(),
        None => Vec::new(),
    };
    Block { source, rows }
}

/// 絕對列號轉為區塊內列號 (從 1 起算)
fn local_rows(range: &RangeRef, deletion: (u32, u32)) -> Result<(u32, u32)> {
    let (start, end) = deletion;
    let invalid = || ReportError::InvalidDeletionRange {
        start,
        end,
        block_start: range.start.row,
        block_end: range.end.row,
    };
    if start > end || start < range.start.row || end > range.end.row {
        return Err(invalid());
    }
    Ok((start - range.start.row + 1, end - range.start.row + 1))
}

/// Range contents as they stand, formulas included. Used for tables that
/// need no row deletion and for the split fallback.
pub fn copy_block(workbook: &Workbook, sheet: &str, range: &RangeRef) -> Result<Block> {
    let source = workbook.sheet(sheet)?;
    Ok(read_block(source, Some(*range), *range))
}

/// The two pieces left around `deletion`; an empty side is omitted.
pub fn split_ranges(range: &RangeRef, deletion: (u32, u32)) -> Vec<RangeRef> {
    let (start, end) = deletion;
    let mut ranges = Vec::with_capacity(2);
    if start > range.start.row {
        ranges.push(range.with_rows(range.start.row, start - 1));
    }
    if end < range.end.row {
        ranges.push(range.with_rows(end + 1, range.end.row));
    }
    ranges
}

fn transplant(
    workbook: &mut Workbook,
    sheet: &str,
    range: &RangeRef,
    deletion: (u32, u32),
    flatten: bool,
) -> Result<Block> {
    let (local_start, local_end) = local_rows(range, deletion)?;
    workbook.copy(sheet, range)?;

    let scratch = ScratchSheet::create(workbook)?;
    let book = &mut *scratch.workbook;

    book.paste(SCRATCH_SHEET, CellRef::new(1, 1), PasteMode::All)?;
    book.clear_clipboard();

    if flatten {
        if let Some(used) = book.sheet(SCRATCH_SHEET)?.used_range() {
            book.materialize(SCRATCH_SHEET, &used)?;
        }
    }

    let temp = book.sheet_mut(SCRATCH_SHEET)?;
    temp.delete_rows(local_start, local_end);
    tracing::debug!(
        "Deleted rows {}-{} (scratch rows {}-{})",
        deletion.0,
        deletion.1,
        local_start,
        local_end
    );

    let remaining = range.row_count() - (local_end - local_start + 1);
    let area = (remaining > 0).then(|| {
        RangeRef::new(CellRef::new(1, 1), CellRef::new(remaining, range.col_count()))
    });
    let block = read_block(temp, area, *range);
    Ok(block)
}

/// 複製範圍到暫存工作表、公式轉數值後刪除 `deletion` 列。
///
/// Deletion rows are absolute source rows and must fall inside `range`. The
/// scratch sheet and the clipboard are released on every exit path.
pub fn transplant_with_deletion(
    workbook: &mut Workbook,
    sheet: &str,
    range: &RangeRef,
    deletion: (u32, u32),
) -> Result<Block> {
    let result = transplant(workbook, sheet, range, deletion, true);
    workbook.clear_clipboard();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::formula::REF_ERROR;
    use crate::grid::CellValue;

    /// P11:R41，Q 欄每列參照 P 欄，R41 參照將被刪除的第 27 列
    fn platform_workbook() -> Workbook {
        let mut sheet = Sheet::new("數位平台收益");
        for row in 11..=41 {
            sheet.set(CellRef::new(row, 16), Cell::number(row as f64));
            sheet.set(
                CellRef::new(row, 17),
                Cell::number(row as f64 * 2.0).with_formula(format!("=P{}*2", row)),
            );
        }
        sheet.set(
            CellRef::parse("R41").unwrap(),
            Cell::number(27.0).with_formula("=P27"),
        );
        Workbook::from_sheets(vec![sheet])
    }

    #[test]
    fn test_transplant_removes_rows_and_formulas() {
        let mut workbook = platform_workbook();
        let range = RangeRef::parse("P11:R41").unwrap();

        let block =
            transplant_with_deletion(&mut workbook, "數位平台收益", &range, (23, 31)).unwrap();

        assert_eq!(block.row_count(), 31 - 9);
        assert_eq!(block.col_count(), 3);
        assert_eq!(block.formula_count(), 0);
        assert!(block
            .rows
            .iter()
            .flatten()
            .all(|cell| cell.display_text() != REF_ERROR));

        // 第 12 列 (原 32 列) 緊接在原 22 列之後
        assert_eq!(block.rows[11][0].value, CellValue::Number(22.0));
        assert_eq!(block.rows[12][0].value, CellValue::Number(32.0));
        assert_eq!(block.rows[12][1].value, CellValue::Number(64.0));
        // 總計公式的快取值保留
        assert_eq!(block.rows[21][2].value, CellValue::Number(27.0));

        assert!(!workbook.has_sheet(SCRATCH_SHEET));
        assert!(!workbook.has_clipboard());
    }

    #[test]
    fn test_deleting_without_flattening_leaves_ref_errors() {
        let mut workbook = platform_workbook();
        let range = RangeRef::parse("P11:R41").unwrap();

        let block = transplant(&mut workbook, "數位平台收益", &range, (23, 31), false).unwrap();

        assert!(block.formula_count() > 0);
        assert_eq!(block.rows[21][2].display_text(), REF_ERROR);
        assert!(!workbook.has_sheet(SCRATCH_SHEET));
    }

    #[test]
    fn test_scratch_collision_fails_and_cleans_up() {
        let mut workbook = platform_workbook();
        workbook.add_sheet(SCRATCH_SHEET).unwrap();
        let range = RangeRef::parse("P11:R41").unwrap();

        let result = transplant_with_deletion(&mut workbook, "數位平台收益", &range, (23, 31));

        assert!(matches!(result, Err(ReportError::SheetExists { .. })));
        assert!(!workbook.has_clipboard());
        // 既有的同名工作表不可被移除
        assert!(workbook.has_sheet(SCRATCH_SHEET));
    }

    #[test]
    fn test_missing_sheet_and_bad_rows() {
        let mut workbook = platform_workbook();
        let range = RangeRef::parse("P11:R41").unwrap();

        assert!(matches!(
            transplant_with_deletion(&mut workbook, "missing", &range, (23, 31)),
            Err(ReportError::SheetNotFound { .. })
        ));
        assert!(matches!(
            transplant_with_deletion(&mut workbook, "數位平台收益", &range, (5, 31)),
            Err(ReportError::InvalidDeletionRange { .. })
        ));
        assert!(!workbook.has_sheet(SCRATCH_SHEET));
        assert!(!workbook.has_clipboard());
    }

    #[test]
    fn test_deleting_whole_block_yields_empty_block() {
        let mut workbook = platform_workbook();
        let range = RangeRef::parse("P11:R41").unwrap();

        let block =
            transplant_with_deletion(&mut workbook, "數位平台收益", &range, (11, 41)).unwrap();
        assert_eq!(block.row_count(), 0);
    }

    #[test]
    fn test_split_ranges() {
        let range = RangeRef::parse("P11:S41").unwrap();
        let parts = split_ranges(&range, (23, 31));
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].to_string(), "P11:S22");
        assert_eq!(parts[1].to_string(), "P32:S41");

        assert_eq!(split_ranges(&range, (11, 20)).len(), 1);
        assert!(split_ranges(&range, (11, 41)).is_empty());
    }

    #[test]
    fn test_copy_block_keeps_formulas() {
        let workbook = platform_workbook();
        let range = RangeRef::parse("P11:Q12").unwrap();
        let block = copy_block(&workbook, "數位平台收益", &range).unwrap();
        assert_eq!(block.row_count(), 2);
        assert_eq!(block.formula_count(), 2);
    }
}
