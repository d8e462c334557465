use crate::domain::ports::GridReader;
use crate::grid::{CellRef, CellValue, RangeRef};
use crate::utils::error::ReadFailure;

/// 標籤搜尋結果：找到、找不到、讀取失敗三者分開
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(CellRef),
    NotFound,
    Failed(ReadFailure),
}

impl Lookup {
    pub fn cell(&self) -> Option<CellRef> {
        match self {
            Lookup::Found(cell) => Some(*cell),
            _ => None,
        }
    }
}

/// Finds the row holding `label` inside `window` and pairs it with `column`.
pub fn resolve<G: GridReader + ?Sized>(grid: &G, label: &str, window: &RangeRef, column: u32) -> Lookup {
    match grid.find_row(label, window) {
        Ok(Some(row)) => {
            tracing::debug!("'{}' found in '{}' at row {}", label, grid.name(), row);
            Lookup::Found(CellRef::new(row, column))
        }
        Ok(None) => {
            tracing::warn!("Label '{}' not found in '{}' ({})", label, grid.name(), window);
            Lookup::NotFound
        }
        Err(failure) => {
            tracing::warn!("Error finding text '{}': {}", label, failure);
            Lookup::Failed(failure)
        }
    }
}

/// Typed value at `cell`; read failures are logged and read as zero.
pub fn read_value<G: GridReader + ?Sized>(grid: &G, cell: CellRef) -> CellValue {
    grid.value_at(cell).unwrap_or_else(|failure| {
        tracing::warn!("Error getting cell value at {}: {}", cell, failure);
        CellValue::Number(0.0)
    })
}

/// Display text at `cell`; read failures are logged and read as empty text.
pub fn read_text<G: GridReader + ?Sized>(grid: &G, cell: CellRef) -> String {
    grid.text_at(cell).unwrap_or_else(|failure| {
        tracing::warn!("Error getting cell text at {}: {}", cell, failure);
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Sheet};

    struct BrokenGrid;

    impl GridReader for BrokenGrid {
        fn name(&self) -> &str {
            "broken"
        }

        fn find_row(&self, _text: &str, _window: &RangeRef) -> Result<Option<u32>, ReadFailure> {
            Err(ReadFailure::Unreadable {
                sheet: "broken".to_string(),
                reason: "locked".to_string(),
            })
        }

        fn value_at(&self, _cell: CellRef) -> Result<CellValue, ReadFailure> {
            Err(ReadFailure::Unreadable {
                sheet: "broken".to_string(),
                reason: "locked".to_string(),
            })
        }

        fn text_at(&self, _cell: CellRef) -> Result<String, ReadFailure> {
            Err(ReadFailure::Unreadable {
                sheet: "broken".to_string(),
                reason: "locked".to_string(),
            })
        }
    }

    #[test]
    fn test_three_distinct_outcomes() {
        let mut sheet = Sheet::new("數位戶");
        sheet.set(CellRef::new(7, 2), Cell::text("月目標達成率"));
        let window = RangeRef::parse("A1:Z100").unwrap();

        assert_eq!(
            resolve(&sheet, "月目標達成率", &window, 20),
            Lookup::Found(CellRef::new(7, 20))
        );
        assert_eq!(resolve(&sheet, "累積月實際數", &window, 20), Lookup::NotFound);
        assert!(matches!(
            resolve(&BrokenGrid, "月目標數", &window, 20),
            Lookup::Failed(_)
        ));
    }

    #[test]
    fn test_reads_degrade_to_defaults() {
        assert_eq!(read_value(&BrokenGrid, CellRef::new(1, 1)), CellValue::Number(0.0));
        assert_eq!(read_text(&BrokenGrid, CellRef::new(1, 1)), "");
    }
}
