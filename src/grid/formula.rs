//! A1 reference handling inside formula text.
//!
//! Only what structural edits need: finding references, shifting relative
//! references when a formula is pasted elsewhere, and rewriting references when
//! rows are deleted (references into deleted rows become `#REF!`).

use crate::grid::coord::{column_label_to_index, index_to_column_label, CellRef};
use once_cell::sync::Lazy;
use regex::Regex;

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)([A-Z]{1,3})(\$?)([0-9]+)").expect("valid reference regex"));

pub const REF_ERROR: &str = "#REF!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulaRef {
    pub cell: CellRef,
    pub col_absolute: bool,
    pub row_absolute: bool,
    /// Qualified with another sheet name (`Sheet1!A1`).
    pub qualified: bool,
}

impl FormulaRef {
    fn render(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            index_to_column_label(self.cell.col).unwrap_or_default(),
            if self.row_absolute { "$" } else { "" },
            self.cell.row
        )
    }
}

/// Rebuilds `formula`, letting `rewrite` replace each reference token.
/// Text inside string literals is left untouched.
fn rewrite_references<F>(formula: &str, mut rewrite: F) -> String
where
    F: FnMut(&FormulaRef) -> Option<String>,
{
    let mut output = String::with_capacity(formula.len());
    let mut last = 0;

    for caps in REFERENCE.captures_iter(formula) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let prev = formula[..whole.start()].chars().next_back();
        let next = formula[whole.end()..].chars().next();

        // 函數名稱 (LOG10)、工作表名稱或較長識別字的一部分不是參照
        let prev_is_word = prev.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.');
        let next_is_word =
            next.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '(' || c == '!');
        let in_string = formula[..whole.start()].matches('"').count() % 2 == 1;
        if prev_is_word || next_is_word || in_string {
            continue;
        }

        let col = match column_label_to_index(&caps[2]) {
            Ok(col) => col,
            Err(_) => continue,
        };
        let row: u32 = match caps[4].parse() {
            Ok(row) if row > 0 => row,
            _ => continue,
        };

        let reference = FormulaRef {
            cell: CellRef::new(row, col),
            col_absolute: !caps[1].is_empty(),
            row_absolute: !caps[3].is_empty(),
            qualified: prev == Some('!'),
        };

        output.push_str(&formula[last..whole.start()]);
        match rewrite(&reference) {
            Some(replacement) => output.push_str(&replacement),
            None => output.push_str(whole.as_str()),
        }
        last = whole.end();
    }

    output.push_str(&formula[last..]);
    output
}

pub fn references(formula: &str) -> Vec<FormulaRef> {
    let mut found = Vec::new();
    rewrite_references(formula, |reference| {
        found.push(*reference);
        None
    });
    found
}

/// Shifts relative references as a paste at a different location does.
/// A reference pushed off the grid becomes `#REF!`.
pub fn shift_references(formula: &str, row_delta: i64, col_delta: i64) -> String {
    rewrite_references(formula, |reference| {
        let mut shifted = *reference;
        let row = if reference.row_absolute {
            reference.cell.row as i64
        } else {
            reference.cell.row as i64 + row_delta
        };
        let col = if reference.col_absolute {
            reference.cell.col as i64
        } else {
            reference.cell.col as i64 + col_delta
        };
        if row < 1 || col < 1 {
            return Some(REF_ERROR.to_string());
        }
        shifted.cell = CellRef::new(row as u32, col as u32);
        Some(shifted.render())
    })
}

/// Adjusts same-sheet references after rows `start..=end` are deleted.
pub fn adjust_for_deleted_rows(formula: &str, start: u32, end: u32) -> String {
    let removed = end - start + 1;
    rewrite_references(formula, |reference| {
        if reference.qualified {
            return None;
        }
        let row = reference.cell.row;
        if (start..=end).contains(&row) {
            Some(REF_ERROR.to_string())
        } else if row > end {
            let mut moved = *reference;
            moved.cell.row = row - removed;
            Some(moved.render())
        } else {
            None
        }
    })
}

pub fn has_ref_error(formula: &str) -> bool {
    formula.contains(REF_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_skip_function_names() {
        let refs = references("=SUM(A1:B2)+LOG10(C3)*$D$4");
        let cells: Vec<CellRef> = refs.iter().map(|r| r.cell).collect();
        assert_eq!(
            cells,
            vec![
                CellRef::new(1, 1),
                CellRef::new(2, 2),
                CellRef::new(3, 3),
                CellRef::new(4, 4)
            ]
        );
        assert!(refs[3].col_absolute && refs[3].row_absolute);
    }

    #[test]
    fn test_references_ignore_string_literals() {
        let refs = references("=IF(A1>0,\"B2\",C3)");
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_shift_references() {
        assert_eq!(shift_references("=P11+Q12", -10, -15), "=A1+B2");
        assert_eq!(shift_references("=$P$11+Q12", -10, -15), "=$P$11+B2");
        assert_eq!(shift_references("=A1", -1, 0), "=#REF!");
    }

    #[test]
    fn test_adjust_for_deleted_rows() {
        assert_eq!(adjust_for_deleted_rows("=A2+A5", 3, 4), "=A2+A3");
        assert_eq!(adjust_for_deleted_rows("=SUM(A3:A4)", 3, 4), "=SUM(#REF!:#REF!)");
        assert_eq!(adjust_for_deleted_rows("=Other!A9", 3, 4), "=Other!A9");
        assert!(has_ref_error(&adjust_for_deleted_rows("=A3*2", 3, 4)));
    }
}
