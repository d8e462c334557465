use crate::document::compose::ComposeReport;
use crate::document::model::Document;
use crate::grid::{Cell, CellValue, RangeRef, Workbook};

/// 指標原始值：數值 (供計算/格式化) 或顯示文字 (例如百分比)
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Value(CellValue),
    Text(String),
}

/// 依設定順序保存的指標對照表；找不到的標籤不會有項目
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap {
    entries: Vec<(String, MetricValue)>,
}

impl MetricMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetricValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// 可插入文件的矩形資料區塊
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Range the block was taken from, in source coordinates.
    pub source: RangeRef,
    pub rows: Vec<Vec<Cell>>,
}

impl Block {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn formula_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|cell| cell.formula.is_some())
            .count()
    }
}

/// Extract 階段的結果：工作階段 (活頁簿) 與指標
#[derive(Debug)]
pub struct Extraction {
    pub workbook: Workbook,
    pub month: u32,
    pub metrics: MetricMap,
}

#[derive(Debug, Clone)]
pub struct EmailDraft {
    pub subject: String,
    pub body: Document,
}

#[derive(Debug, Clone)]
pub struct ComposedReport {
    pub draft: EmailDraft,
    pub report: ComposeReport,
}
