//! Builds a [`Workbook`] from files on disk.
//!
//! Supported sources:
//! - `.xlsx` / `.xlsm` / `.xls` / `.ods` through calamine (cached values + formulas);
//!   percent-formatted `.xlsx` cells also get their display text
//! - `.json` snapshots (values, formulas, display text and styles)
//! - a directory of `<sheet>.csv` files (values and display text)

use crate::grid::coord::CellRef;
use crate::grid::sheet::{Cell, CellStyle, CellValue, Sheet};
use crate::grid::workbook::Workbook;
use crate::grid::xlsx_styles::{self, PercentStyles};
use crate::utils::error::{ReportError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookSnapshot {
    pub sheets: Vec<SheetSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub name: String,
    #[serde(default)]
    pub cells: Vec<CellSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// A1 reference, e.g. `Q50`.
    pub cell: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub style: CellStyle,
}

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    if !path.exists() {
        return Err(ReportError::SourceNotFound {
            path: path.display().to_string(),
        });
    }

    if path.is_dir() {
        return load_csv_dir(path);
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => load_json(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path),
        other => Err(ReportError::ConfigError {
            message: format!("Unsupported workbook format '{}': {}", other, path.display()),
        }),
    }
}

fn percent_styles(path: &Path, sheet_names: &[String]) -> PercentStyles {
    let is_ooxml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"));
    if !is_ooxml {
        return PercentStyles::default();
    }
    match PercentStyles::read(path, sheet_names) {
        Ok(styles) => styles,
        Err(e) => {
            tracing::warn!("Number formats unavailable for {}: {}", path.display(), e);
            PercentStyles::default()
        }
    }
}

pub fn load_spreadsheet(path: &Path) -> Result<Workbook> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let styles = percent_styles(path, &sheet_names);
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let mut sheet = Sheet::new(name.clone());
        let range = workbook.worksheet_range(name)?;
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (row_idx, row) in range.rows().enumerate() {
            for (col_idx, data) in row.iter().enumerate() {
                let value = match data {
                    Data::Empty => continue,
                    Data::String(s) if s.is_empty() => continue,
                    Data::String(s) => CellValue::Text(s.clone()),
                    Data::Float(n) => CellValue::Number(*n),
                    Data::Int(n) => CellValue::Number(*n as f64),
                    Data::Bool(b) => CellValue::Bool(*b),
                    Data::Error(e) => CellValue::Error(e.to_string()),
                    Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
                    Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
                };
                let cell = CellRef::new(
                    start_row + row_idx as u32 + 1,
                    start_col + col_idx as u32 + 1,
                );
                let entry = match (value, styles.decimals(name, cell)) {
                    (CellValue::Number(n), Some(decimals)) => {
                        Cell::number(n).with_display(xlsx_styles::percent_text(n, decimals))
                    }
                    (value, _) => Cell::new(value),
                };
                sheet.set(cell, entry);
            }
        }

        // 公式範圍可能與數值範圍起點不同
        if let Ok(formulas) = workbook.worksheet_formula(name) {
            let (start_row, start_col) = formulas.start().unwrap_or((0, 0));
            for (row_idx, row) in formulas.rows().enumerate() {
                for (col_idx, formula) in row.iter().enumerate() {
                    if formula.is_empty() {
                        continue;
                    }
                    let cell = CellRef::new(
                        start_row + row_idx as u32 + 1,
                        start_col + col_idx as u32 + 1,
                    );
                    let text = if formula.starts_with('=') {
                        formula.clone()
                    } else {
                        format!("={}", formula)
                    };
                    let existing = sheet.get(cell).cloned().unwrap_or_default();
                    sheet.set(cell, existing.with_formula(text));
                }
            }
        }

        tracing::debug!("Loaded sheet '{}' ({} cells)", name, sheet.len());
        sheets.push(sheet);
    }

    Ok(Workbook::from_sheets(sheets))
}

pub fn load_json(path: &Path) -> Result<Workbook> {
    let content = std::fs::read_to_string(path)?;
    let snapshot: WorkbookSnapshot = serde_json::from_str(&content)?;
    from_snapshot(snapshot)
}

pub fn from_snapshot(snapshot: WorkbookSnapshot) -> Result<Workbook> {
    let mut sheets = Vec::with_capacity(snapshot.sheets.len());
    for sheet_snapshot in snapshot.sheets {
        let mut sheet = Sheet::new(sheet_snapshot.name);
        for cell in sheet_snapshot.cells {
            let reference = CellRef::parse(&cell.cell)?;
            let value = match cell.value {
                serde_json::Value::Null => CellValue::Empty,
                serde_json::Value::Bool(b) => CellValue::Bool(b),
                serde_json::Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
                serde_json::Value::String(s) => CellValue::Text(s),
                other => CellValue::Text(other.to_string()),
            };
            sheet.set(
                reference,
                Cell {
                    value,
                    formula: cell.formula,
                    text: cell.text,
                    style: cell.style,
                },
            );
        }
        sheets.push(sheet);
    }
    Ok(Workbook::from_sheets(sheets))
}

/// 每個 CSV 檔為一張工作表 (檔名即工作表名稱)
pub fn load_csv_dir(dir: &Path) -> Result<Workbook> {
    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    let mut sheets = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
        let mut sheet = Sheet::new(name);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&file)?;

        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            for (col_idx, field) in record.iter().enumerate() {
                if field.trim().is_empty() {
                    continue;
                }
                let cell = CellRef::new(row_idx as u32 + 1, col_idx as u32 + 1);
                sheet.set(cell, parse_csv_field(field));
            }
        }
        sheets.push(sheet);
    }

    Ok(Workbook::from_sheets(sheets))
}

/// CSV 欄位保留原字串作為顯示文字，能解析者另存數值
fn parse_csv_field(field: &str) -> Cell {
    let trimmed = field.trim();
    let numeric: String = trimmed.chars().filter(|c| *c != ',').collect();

    if let Some(percent) = numeric.strip_suffix('%') {
        if let Ok(n) = percent.trim().parse::<f64>() {
            return Cell::number(n / 100.0).with_display(trimmed);
        }
    }
    if let Ok(n) = numeric.parse::<f64>() {
        return Cell::number(n).with_display(trimmed);
    }
    Cell::text(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_snapshot() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let json = r#"{
            "sheets": [
                {
                    "name": "數位戶",
                    "cells": [
                        {"cell": "A5", "value": "月目標達成率"},
                        {"cell": "T5", "value": 0.834, "text": "83.4%", "bold": true},
                        {"cell": "T6", "value": 12, "formula": "=T4*2"}
                    ]
                }
            ]
        }"#;
        file.write_all(json.as_bytes()).unwrap();

        let workbook = load_workbook(file.path()).unwrap();
        let sheet = workbook.sheet("數位戶").unwrap();
        let rate = sheet.get(CellRef::parse("T5").unwrap()).unwrap();
        assert_eq!(rate.display_text(), "83.4%");
        assert!(rate.style.bold);
        assert_eq!(sheet.formula_count(), 1);
    }

    #[test]
    fn test_load_csv_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("數位平台收益.csv"),
            "月目標數,\"12,000,000\"\n月目標達成率,83.4%\n",
        )
        .unwrap();

        let workbook = load_workbook(dir.path()).unwrap();
        let sheet = workbook.sheet("數位平台收益").unwrap();
        assert_eq!(
            sheet.get(CellRef::parse("B1").unwrap()).unwrap().value,
            CellValue::Number(12_000_000.0)
        );
        let rate = sheet.get(CellRef::parse("B2").unwrap()).unwrap();
        assert_eq!(rate.display_text(), "83.4%");
        let value = rate.value.as_number().unwrap();
        assert!((value - 0.834).abs() < 1e-9);
    }

    #[test]
    fn test_load_xlsx_values_formulas_and_percent_text() {
        use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2025統計(202503).xlsx");

        let mut book = XlsxWorkbook::new();
        let worksheet = book.add_worksheet();
        worksheet.set_name("數位戶").unwrap();
        worksheet.write_string(4, 1, "月目標達成率").unwrap();
        worksheet
            .write_number_with_format(4, 19, 0.834, &Format::new().set_num_format("0.0%"))
            .unwrap();
        worksheet
            .write_number_with_format(5, 19, 0.83, &Format::new().set_num_format("0%"))
            .unwrap();
        worksheet.write_number(6, 19, 130_333.0).unwrap();
        worksheet.write_formula(7, 19, "=T7*2").unwrap();
        book.save(&path).unwrap();

        let workbook = load_workbook(&path).unwrap();
        let sheet = workbook.sheet("數位戶").unwrap();

        let label = sheet.get(CellRef::parse("B5").unwrap()).unwrap();
        assert_eq!(label.display_text(), "月目標達成率");

        let rate = sheet.get(CellRef::parse("T5").unwrap()).unwrap();
        assert_eq!(rate.display_text(), "83.4%");
        assert!((rate.value.as_number().unwrap() - 0.834).abs() < 1e-9);
        assert_eq!(
            sheet.get(CellRef::parse("T6").unwrap()).unwrap().display_text(),
            "83%"
        );

        let target = sheet.get(CellRef::parse("T7").unwrap()).unwrap();
        assert_eq!(target.value, CellValue::Number(130_333.0));
        assert_eq!(target.display_text(), "130333");

        let doubled = sheet.get(CellRef::parse("T8").unwrap()).unwrap();
        assert_eq!(doubled.formula.as_deref(), Some("=T7*2"));
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let result = load_workbook(Path::new("/nonexistent/2025統計(202503).xlsx"));
        assert!(matches!(result, Err(ReportError::SourceNotFound { .. })));
    }
}
