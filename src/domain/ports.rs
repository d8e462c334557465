use crate::document::model::{Cursor, Emphasis, Paragraph, ParagraphId, Span};
use crate::domain::model::{Block, ComposedReport, Extraction};
use crate::grid::{CellRef, CellValue, RangeRef};
use crate::utils::error::{ReadFailure, Result};
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// 以標籤搜尋取代固定座標的唯讀表格介面
pub trait GridReader {
    fn name(&self) -> &str;

    /// Row of the first cell in `window` (row by row) whose display text
    /// contains `text`. `Ok(None)` is a normal "not found".
    fn find_row(&self, text: &str, window: &RangeRef) -> std::result::Result<Option<u32>, ReadFailure>;

    fn value_at(&self, cell: CellRef) -> std::result::Result<CellValue, ReadFailure>;

    fn text_at(&self, cell: CellRef) -> std::result::Result<String, ReadFailure>;
}

/// 文件編輯宿主 (郵件草稿本文)
pub trait DocumentHost {
    /// Next exact-text match at or after `from`, in document order.
    fn find(&self, text: &str, from: Cursor) -> Option<Span>;

    fn paragraph_text(&self, id: ParagraphId) -> Option<String>;

    fn apply_emphasis(&mut self, span: &Span, emphasis: Emphasis) -> bool;

    /// Replaces the matched text with the given blocks; consecutive blocks are
    /// separated by a blank paragraph.
    fn replace_with_blocks(&mut self, span: &Span, blocks: Vec<Block>) -> bool;

    fn insert_table(&mut self, span: &Span, block: Block) -> bool {
        self.replace_with_blocks(span, vec![block])
    }

    fn append_paragraphs(&mut self, paragraphs: Vec<Paragraph>);
}

pub trait SignatureSource {
    /// `Ok(None)` when no signature is configured or available.
    fn signature(&self) -> Result<Option<Vec<Paragraph>>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extraction>;
    async fn transform(&self, extraction: Extraction) -> Result<ComposedReport>;
    async fn load(&self, report: ComposedReport) -> Result<String>;
}
