//! Percent number formats of `.xlsx` cells.
//!
//! calamine only hands out values, so the display text of a percent-formatted
//! cell would be its raw fraction (`0.834`). This reads `xl/styles.xml` and the
//! per-cell style ids of each worksheet straight from the archive and keeps the
//! cells whose format scales by 100 and appends `%`.

use crate::grid::coord::CellRef;
use crate::utils::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// 每張工作表中套用百分比格式的儲存格及其小數位數
#[derive(Debug, Default)]
pub struct PercentStyles {
    sheets: HashMap<String, HashMap<CellRef, usize>>,
}

impl PercentStyles {
    pub fn read(path: &Path, sheet_names: &[String]) -> Result<Self> {
        let mut archive = ZipArchive::new(File::open(path)?)?;

        let formats = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => percent_formats(&xml),
            None => return Ok(Self::default()),
        };
        if formats.iter().all(Option::is_none) {
            return Ok(Self::default());
        }

        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?.unwrap_or_default();
        let rels_xml =
            read_part(&mut archive, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
        let parts = worksheet_parts(&workbook_xml, &rels_xml);

        let mut sheets = HashMap::new();
        for name in sheet_names {
            let Some(part) = parts.get(name) else {
                continue;
            };
            let Some(xml) = read_part(&mut archive, part)? else {
                tracing::warn!("Worksheet part {} missing for '{}'", part, name);
                continue;
            };
            let cells: HashMap<CellRef, usize> = cell_style_ids(&xml)
                .into_iter()
                .filter_map(|(cell, style)| {
                    formats.get(style).copied().flatten().map(|decimals| (cell, decimals))
                })
                .collect();
            if !cells.is_empty() {
                tracing::debug!("'{}': {} percent-formatted cells", name, cells.len());
                sheets.insert(name.clone(), cells);
            }
        }

        Ok(Self { sheets })
    }

    pub fn decimals(&self, sheet: &str, cell: CellRef) -> Option<usize> {
        self.sheets.get(sheet)?.get(&cell).copied()
    }
}

/// 依格式小數位數輸出，例如 0.834 / 1 位 → `83.4%`
pub fn percent_text(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn builtin_percent(id: u16) -> Option<usize> {
    match id {
        9 => Some(0),
        10 => Some(2),
        _ => None,
    }
}

/// Decimal places of a percent format code, `None` when the code is not a percent.
///
/// Only the first (positive) section counts. Quoted literals, `[...]` tokens and
/// backslash escapes are not format characters.
pub fn percent_decimals(code: &str) -> Option<usize> {
    let mut plain = String::new();
    let mut in_quote = false;
    let mut in_bracket = false;
    let mut chars = code.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quote = !in_quote,
            _ if in_quote => {}
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            _ if in_bracket => {}
            '\\' => {
                chars.next();
            }
            ';' => break,
            _ => plain.push(ch),
        }
    }

    if !plain.contains('%') {
        return None;
    }
    let decimals = plain
        .split_once('.')
        .map(|(_, fraction)| {
            fraction
                .chars()
                .take_while(|c| matches!(c, '0' | '#' | '?'))
                .count()
        })
        .unwrap_or(0);
    Some(decimals)
}

/// `cellXfs` index → percent decimals.
fn percent_formats(xml: &str) -> Vec<Option<usize>> {
    let mut custom: HashMap<u16, String> = HashMap::new();
    let mut formats = Vec::new();
    let mut in_cell_xfs = false;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let id = attr(e, b"numFmtId").and_then(|id| id.parse().ok());
                    if let (Some(id), Some(code)) = (id, attr(e, b"formatCode")) {
                        custom.insert(id, code.replace("&quot;", "\"").replace("&amp;", "&"));
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id: u16 = attr(e, b"numFmtId")
                        .and_then(|id| id.parse().ok())
                        .unwrap_or(0);
                    let decimals = match custom.get(&id) {
                        Some(code) => percent_decimals(code),
                        None => builtin_percent(id),
                    };
                    formats.push(decimals);
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => break,
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("styles.xml parse stopped: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    formats
}

/// Cells carrying a non-default style id (`<c r="B5" s="3">`).
fn cell_style_ids(xml: &str) -> Vec<(CellRef, usize)> {
    let mut cells = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"c" => {
                let style = attr(e, b"s").and_then(|s| s.parse::<usize>().ok());
                let cell = attr(e, b"r").and_then(|r| CellRef::parse(&r).ok());
                if let (Some(style), Some(cell)) = (style, cell) {
                    if style > 0 {
                        cells.push((cell, style));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("worksheet parse stopped: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    cells
}

/// 工作表名稱 → 壓縮檔內路徑 (經由 workbook.xml 的 r:id 與 rels 對應)
fn worksheet_parts(workbook_xml: &str, rels_xml: &str) -> HashMap<String, String> {
    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    let part = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    };
                    targets.insert(id, part);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut parts = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"sheet" => {
                let part = attr(e, b"r:id").and_then(|id| targets.get(&id).cloned());
                if let (Some(name), Some(part)) = (attr(e, b"name"), part) {
                    parts.insert(name, part);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    parts
}
