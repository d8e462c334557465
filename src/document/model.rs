//! In-memory rich document used as the email body.
//!
//! A document is a sequence of nodes: paragraphs made of styled runs, and
//! tables whose cells each hold one paragraph. Text search walks every
//! paragraph in document order, table cells included.

use crate::domain::model::Block;
use crate::domain::ports::DocumentHost;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Bold,
    Underline,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    fn apply(&mut self, emphasis: Emphasis) {
        match emphasis {
            Emphasis::Bold => self.bold = true,
            Emphasis::Underline => self.underline = true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            runs: vec![Run::plain(text)],
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(|run| run.text.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ensures a run boundary at byte `offset`.
    fn split_at(&mut self, offset: usize) {
        let mut position = 0;
        for index in 0..self.runs.len() {
            let length = self.runs[index].text.len();
            if offset > position && offset < position + length {
                let tail = self.runs[index].text.split_off(offset - position);
                let mut next = self.runs[index].clone();
                next.text = tail;
                self.runs.insert(index + 1, next);
                return;
            }
            position += length;
        }
    }

    pub fn emphasize(&mut self, start: usize, end: usize, emphasis: Emphasis) {
        self.split_at(start);
        self.split_at(end);
        let mut position = 0;
        for run in &mut self.runs {
            let length = run.text.len();
            if length > 0 && position >= start && position + length <= end {
                run.apply(emphasis);
            }
            position += length;
        }
    }

    /// Copy of the byte range `start..end`, keeping run styles.
    pub fn slice(&self, start: usize, end: usize) -> Paragraph {
        let mut copy = self.clone();
        copy.split_at(start);
        copy.split_at(end);
        let mut position = 0;
        let mut runs = Vec::new();
        for run in copy.runs {
            let length = run.text.len();
            if length > 0 && position >= start && position + length <= end {
                runs.push(run);
            }
            position += length;
        }
        Paragraph { runs }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableCell {
    pub paragraph: Paragraph,
    pub fill: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    /// Table carrying the block's display text and cell styles.
    pub fn from_block(block: &Block) -> Self {
        let rows = block
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let text = cell.display_text();
                        let paragraph = if text.is_empty() {
                            Paragraph::blank()
                        } else {
                            Paragraph::blank().with_run(Run {
                                text,
                                bold: cell.style.bold,
                                italic: cell.style.italic,
                                underline: false,
                            })
                        };
                        TableCell {
                            paragraph,
                            fill: cell.style.fill.clone(),
                            color: cell.style.color.clone(),
                        }
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Paragraph(Paragraph),
    Table(Table),
}

/// 段落位置：頂層段落或表格儲存格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphId {
    pub node: usize,
    pub cell: Option<(usize, usize)>,
}

/// Search position: paragraph ordinal in document order plus byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub index: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub index: usize,
    pub paragraph: ParagraphId,
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Cursor just past this match.
    pub fn after(&self) -> Cursor {
        Cursor {
            index: self.index,
            offset: self.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// One paragraph per line.
    pub fn from_text(text: &str) -> Self {
        let nodes = text
            .lines()
            .map(|line| Node::Paragraph(Paragraph::new(line)))
            .collect();
        Self { nodes }
    }

    pub fn paragraph_ids(&self) -> Vec<ParagraphId> {
        let mut ids = Vec::new();
        for (node, content) in self.nodes.iter().enumerate() {
            match content {
                Node::Paragraph(_) => ids.push(ParagraphId { node, cell: None }),
                Node::Table(table) => {
                    for (r, row) in table.rows.iter().enumerate() {
                        for c in 0..row.len() {
                            ids.push(ParagraphId {
                                node,
                                cell: Some((r, c)),
                            });
                        }
                    }
                }
            }
        }
        ids
    }

    pub fn paragraph(&self, id: ParagraphId) -> Option<&Paragraph> {
        match (self.nodes.get(id.node)?, id.cell) {
            (Node::Paragraph(paragraph), None) => Some(paragraph),
            (Node::Table(table), Some((r, c))) => table.rows.get(r)?.get(c).map(|cell| &cell.paragraph),
            _ => None,
        }
    }

    fn paragraph_mut(&mut self, id: ParagraphId) -> Option<&mut Paragraph> {
        match (self.nodes.get_mut(id.node)?, id.cell) {
            (Node::Paragraph(paragraph), None) => Some(paragraph),
            (Node::Table(table), Some((r, c))) => table
                .rows
                .get_mut(r)?
                .get_mut(c)
                .map(|cell| &mut cell.paragraph),
            _ => None,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Table(table) => Some(table),
            Node::Paragraph(_) => None,
        })
    }

    /// Text view: paragraphs as lines, table rows tab-separated.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for node in &self.nodes {
            match node {
                Node::Paragraph(paragraph) => lines.push(paragraph.text()),
                Node::Table(table) => {
                    for row in &table.rows {
                        let cells: Vec<String> =
                            row.iter().map(|cell| cell.paragraph.text()).collect();
                        lines.push(cells.join("\t"));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

impl DocumentHost for Document {
    fn find(&self, text: &str, from: Cursor) -> Option<Span> {
        if text.is_empty() {
            return None;
        }
        let ids = self.paragraph_ids();
        for (index, id) in ids.into_iter().enumerate().skip(from.index) {
            let content = self.paragraph(id)?.text();
            let offset = if index == from.index { from.offset } else { 0 };
            if offset > content.len() || !content.is_char_boundary(offset) {
                continue;
            }
            if let Some(found) = content[offset..].find(text) {
                let start = offset + found;
                return Some(Span {
                    index,
                    paragraph: id,
                    start,
                    end: start + text.len(),
                });
            }
        }
        None
    }

    fn paragraph_text(&self, id: ParagraphId) -> Option<String> {
        self.paragraph(id).map(Paragraph::text)
    }

    fn apply_emphasis(&mut self, span: &Span, emphasis: Emphasis) -> bool {
        match self.paragraph_mut(span.paragraph) {
            Some(paragraph) if span.end <= paragraph.len() => {
                paragraph.emphasize(span.start, span.end, emphasis);
                true
            }
            _ => false,
        }
    }

    fn replace_with_blocks(&mut self, span: &Span, blocks: Vec<Block>) -> bool {
        if span.paragraph.cell.is_some() {
            return false;
        }
        let paragraph = match self.nodes.get(span.paragraph.node) {
            Some(Node::Paragraph(paragraph)) if span.end <= paragraph.len() => paragraph.clone(),
            _ => return false,
        };

        let before = paragraph.slice(0, span.start);
        let after = paragraph.slice(span.end, paragraph.len());

        let mut replacement = Vec::new();
        if !before.is_empty() {
            replacement.push(Node::Paragraph(before));
        }
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                replacement.push(Node::Paragraph(Paragraph::blank()));
            }
            replacement.push(Node::Table(Table::from_block(block)));
        }
        if !after.is_empty() {
            replacement.push(Node::Paragraph(after));
        }

        let node = span.paragraph.node;
        self.nodes.splice(node..=node, replacement);
        true
    }

    fn append_paragraphs(&mut self, paragraphs: Vec<Paragraph>) {
        self.nodes
            .extend(paragraphs.into_iter().map(Node::Paragraph));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, CellStyle, RangeRef};

    fn block(rows: &[&[&str]]) -> Block {
        Block {
            source: RangeRef::parse("A1:B2").unwrap(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|text| Cell::text(*text)).collect())
                .collect(),
        }
    }

    #[test]
    fn test_find_with_cursor_advances() {
        let doc = Document::from_text("abc abc\nxyz abc");
        let first = doc.find("abc", Cursor::default()).unwrap();
        assert_eq!((first.index, first.start), (0, 0));
        let second = doc.find("abc", first.after()).unwrap();
        assert_eq!((second.index, second.start), (0, 4));
        let third = doc.find("abc", second.after()).unwrap();
        assert_eq!((third.index, third.start), (1, 4));
        assert!(doc.find("abc", third.after()).is_none());
    }

    #[test]
    fn test_emphasis_splits_runs() {
        let mut doc = Document::from_text("(1) 數位戶客戶數: 年目標");
        let span = doc.find("(1) 數位戶客戶數:", Cursor::default()).unwrap();
        assert!(doc.apply_emphasis(&span, Emphasis::Underline));

        let paragraph = doc.paragraph(span.paragraph).unwrap();
        assert_eq!(paragraph.runs.len(), 2);
        assert!(paragraph.runs[0].underline);
        assert_eq!(paragraph.runs[0].text, "(1) 數位戶客戶數:");
        assert!(!paragraph.runs[1].underline);
        assert_eq!(paragraph.text(), "(1) 數位戶客戶數: 年目標");
    }

    #[test]
    fn test_replace_placeholder_with_table() {
        let mut doc = Document::from_text("intro\n[TABLE1_PLACEHOLDER]\noutro");
        let span = doc.find("[TABLE1_PLACEHOLDER]", Cursor::default()).unwrap();
        assert!(doc.replace_with_blocks(&span, vec![block(&[&["a", "b"], &["c", "d"]])]));

        assert_eq!(doc.nodes.len(), 3);
        assert!(matches!(doc.nodes[1], Node::Table(_)));
        assert_eq!(doc.plain_text(), "intro\na\tb\nc\td\noutro");
    }

    #[test]
    fn test_replace_with_two_blocks_inserts_blank_line() {
        let mut doc = Document::from_text("[T]");
        let span = doc.find("[T]", Cursor::default()).unwrap();
        doc.replace_with_blocks(&span, vec![block(&[&["a"]]), block(&[&["b"]])]);
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.plain_text(), "a\n\nb");
    }

    #[test]
    fn test_table_cells_are_searchable() {
        let mut doc = Document::from_text("[T]");
        let span = doc.find("[T]", Cursor::default()).unwrap();
        let mut source = block(&[&["數位平台收益"]]);
        source.rows[0][0] = source.rows[0][0].clone().with_style(CellStyle {
            fill: Some("#DDEBF7".to_string()),
            ..Default::default()
        });
        doc.replace_with_blocks(&span, vec![source]);

        let found = doc.find("數位平台收益", Cursor::default()).unwrap();
        assert_eq!(found.paragraph.cell, Some((0, 0)));
        assert!(doc.apply_emphasis(&found, Emphasis::Bold));
        let table = doc.tables().next().unwrap();
        assert!(table.rows[0][0].paragraph.runs[0].bold);
        assert_eq!(table.rows[0][0].fill.as_deref(), Some("#DDEBF7"));
    }
}
