use crate::document::model::{Cursor, Emphasis, Paragraph};
use crate::domain::ports::{DocumentHost, SignatureSource};
use crate::grid::{RangeRef, Workbook};
use crate::report::transplant;
use crate::utils::error::ReportError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    Inserted,
    /// The row-deletion path failed; the table went in as separate pieces.
    InsertedViaFallback { pieces: usize },
    /// 找不到佔位字串
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub placeholder: String,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmphasisReport {
    pub text: String,
    pub emphasis: Emphasis,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    #[default]
    NotRequested,
    Appended,
    Missing,
    Failed,
}

/// 組裝結果摘要，供 CLI 顯示
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ComposeReport {
    pub tables: Vec<TableReport>,
    pub emphasis: Vec<EmphasisReport>,
    pub signature: SignatureStatus,
    /// 需要提醒使用者的訊息
    pub notices: Vec<String>,
}

impl ComposeReport {
    pub fn inserted_tables(&self) -> usize {
        self.tables
            .iter()
            .filter(|table| {
                matches!(
                    table.outcome,
                    TableOutcome::Inserted | TableOutcome::InsertedViaFallback { .. }
                )
            })
            .count()
    }
}

/// Edits a document host in place and records what happened to each step.
pub struct Composer<'a, H: DocumentHost + ?Sized> {
    host: &'a mut H,
    report: ComposeReport,
}

impl<'a, H: DocumentHost + ?Sized> Composer<'a, H> {
    pub fn new(host: &'a mut H) -> Self {
        Self {
            host,
            report: ComposeReport::default(),
        }
    }

    fn record_table(&mut self, placeholder: &str, outcome: TableOutcome) -> TableOutcome {
        self.report.tables.push(TableReport {
            placeholder: placeholder.to_string(),
            outcome: outcome.clone(),
        });
        outcome
    }

    /// 將範圍原樣複製到佔位字串的位置
    pub fn insert_table(
        &mut self,
        workbook: &Workbook,
        sheet: &str,
        range: &RangeRef,
        placeholder: &str,
    ) -> TableOutcome {
        let span = match self.host.find(placeholder, Cursor::default()) {
            Some(span) => span,
            None => {
                tracing::warn!("Placeholder {} not found in email body", placeholder);
                return self.record_table(placeholder, TableOutcome::Skipped);
            }
        };

        let outcome = match transplant::copy_block(workbook, sheet, range) {
            Ok(block) => {
                if self.host.insert_table(&span, block) {
                    tracing::info!("Inserted {} ({}) at {}", range, sheet, placeholder);
                    TableOutcome::Inserted
                } else {
                    TableOutcome::Failed {
                        reason: format!("{} cannot hold a table", placeholder),
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to copy {} from '{}': {}", range, sheet, e);
                TableOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.record_table(placeholder, outcome)
    }

    /// 刪除指定列後插入；失敗時改為插入刪除列前後兩段
    pub fn insert_table_with_deletion(
        &mut self,
        workbook: &mut Workbook,
        sheet: &str,
        range: &RangeRef,
        deletion: (u32, u32),
        placeholder: &str,
    ) -> TableOutcome {
        let span = match self.host.find(placeholder, Cursor::default()) {
            Some(span) => span,
            None => {
                tracing::warn!("Placeholder {} not found in email body", placeholder);
                return self.record_table(placeholder, TableOutcome::Skipped);
            }
        };

        let error = match transplant::transplant_with_deletion(workbook, sheet, range, deletion) {
            Ok(block) => {
                let outcome = if self.host.insert_table(&span, block) {
                    tracing::info!(
                        "Inserted {} ({}) without rows {}-{} at {}",
                        range,
                        sheet,
                        deletion.0,
                        deletion.1,
                        placeholder
                    );
                    TableOutcome::Inserted
                } else {
                    TableOutcome::Failed {
                        reason: format!("{} cannot hold a table", placeholder),
                    }
                };
                return self.record_table(placeholder, outcome);
            }
            Err(e @ ReportError::InvalidDeletionRange { .. }) => {
                tracing::error!("{}", e);
                return self.record_table(
                    placeholder,
                    TableOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
            }
            Err(e) => e,
        };

        tracing::warn!("Error transplanting {} ({}): {}", range, sheet, error);
        tracing::info!("Falling back to copying the rows around {}-{}", deletion.0, deletion.1);

        let pieces: Result<Vec<_>, _> = transplant::split_ranges(range, deletion)
            .iter()
            .map(|part| transplant::copy_block(workbook, sheet, part))
            .collect();

        let outcome = match pieces {
            Ok(pieces) if pieces.is_empty() => TableOutcome::Failed {
                reason: "nothing left outside the deleted rows".to_string(),
            },
            Ok(pieces) => {
                let count = pieces.len();
                if self.host.replace_with_blocks(&span, pieces) {
                    TableOutcome::InsertedViaFallback { pieces: count }
                } else {
                    TableOutcome::Failed {
                        reason: format!("{} cannot hold a table", placeholder),
                    }
                }
            }
            Err(fallback) => {
                tracing::error!("Fallback copy failed too: {}", fallback);
                TableOutcome::Failed {
                    reason: format!("{}; fallback: {}", error, fallback),
                }
            }
        };
        self.record_table(placeholder, outcome)
    }

    fn record_emphasis(&mut self, text: &str, emphasis: Emphasis, applied: bool) -> bool {
        self.report.emphasis.push(EmphasisReport {
            text: text.to_string(),
            emphasis,
            applied,
        });
        applied
    }

    /// 第一個出現處加上粗體或底線
    pub fn emphasize_text(&mut self, text: &str, emphasis: Emphasis) -> bool {
        let applied = match self.host.find(text, Cursor::default()) {
            Some(span) => self.host.apply_emphasis(&span, emphasis),
            None => {
                tracing::warn!("Text '{}' not found for {:?}", text, emphasis);
                false
            }
        };
        self.record_emphasis(text, emphasis, applied)
    }

    /// Emphasizes the `occurrence`-th match whose paragraph, trimmed, is exactly
    /// `text`. Matches inside longer paragraphs are passed over without counting.
    pub fn emphasize_standalone(&mut self, text: &str, occurrence: usize, emphasis: Emphasis) -> bool {
        let mut cursor = Cursor::default();
        let mut count = 0;

        while let Some(span) = self.host.find(text, cursor) {
            cursor = span.after();
            let standalone = self
                .host
                .paragraph_text(span.paragraph)
                .is_some_and(|paragraph| paragraph.trim() == text);
            if !standalone {
                continue;
            }
            count += 1;
            if count == occurrence {
                let applied = self.host.apply_emphasis(&span, emphasis);
                return self.record_emphasis(text, emphasis, applied);
            }
        }

        tracing::warn!(
            "Standalone '{}' occurrence {} not found ({} seen)",
            text,
            occurrence,
            count
        );
        self.record_emphasis(text, emphasis, false)
    }

    /// 空一行後附上簽名檔
    pub fn append_signature(&mut self, source: &dyn SignatureSource) -> SignatureStatus {
        let status = match source.signature() {
            Ok(Some(paragraphs)) => {
                let mut content = Vec::with_capacity(paragraphs.len() + 1);
                content.push(Paragraph::blank());
                content.extend(paragraphs);
                self.host.append_paragraphs(content);
                tracing::info!("Signature appended");
                SignatureStatus::Appended
            }
            Ok(None) => {
                tracing::warn!("No signature configured; the draft has none");
                self.report
                    .notices
                    .push("未附簽名檔，請於寄出前手動加入".to_string());
                SignatureStatus::Missing
            }
            Err(e) => {
                tracing::warn!("Could not add signature: {}", e);
                self.report
                    .notices
                    .push(format!("簽名檔讀取失敗，請手動加入 ({})", e));
                SignatureStatus::Failed
            }
        };
        self.report.signature = status.clone();
        status
    }

    pub fn finish(self) -> ComposeReport {
        self.report
    }
}
