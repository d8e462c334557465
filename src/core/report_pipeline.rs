use crate::config::toml_config::ReportConfig;
use crate::core::{Pipeline, Storage};
use crate::document::compose::Composer;
use crate::document::model::Document;
use crate::document::render;
use crate::document::signature::FileSignature;
use crate::domain::model::{ComposedReport, EmailDraft, Extraction};
use crate::report::source::WorkbookSource;
use crate::report::{metrics, template};
use crate::utils::error::Result;
use std::path::PathBuf;

/// 績效週報：讀取活頁簿 → 組裝郵件草稿 → 輸出 HTML
pub struct ReportPipeline<S: Storage> {
    storage: S,
    config: ReportConfig,
    source: WorkbookSource,
    signature: FileSignature,
    year: i32,
    month: u32,
}

impl<S: Storage> ReportPipeline<S> {
    pub fn new(storage: S, config: ReportConfig, source: WorkbookSource, year: i32, month: u32) -> Self {
        let signature = FileSignature::new(
            config
                .signature
                .as_ref()
                .map(|signature| PathBuf::from(&signature.path)),
        );
        Self {
            storage,
            config,
            source,
            signature,
            year,
            month,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    async fn template(&self) -> Result<String> {
        match &self.config.report.template_path {
            Some(path) => {
                tracing::debug!("Using template {}", path);
                Ok(tokio::fs::read_to_string(path).await?)
            }
            None => Ok(template::DEFAULT_TEMPLATE.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ReportPipeline<S> {
    async fn extract(&self) -> Result<Extraction> {
        let required: Vec<&str> = self.config.grids.iter().map(|grid| grid.sheet.as_str()).collect();
        let workbook = self.source.open(&required)?;

        let window = self.config.search_window()?;
        let metrics = metrics::extract_metrics(&workbook, &self.config.grids, &window, self.month)?;

        Ok(Extraction {
            workbook,
            month: self.month,
            metrics,
        })
    }

    async fn transform(&self, extraction: Extraction) -> Result<ComposedReport> {
        let Extraction {
            mut workbook,
            month,
            metrics,
        } = extraction;

        let text = template::render(&self.template().await?, &metrics, &self.config.grids, month);
        let mut body = Document::from_text(&text);
        let mut composer = Composer::new(&mut body);

        for grid in &self.config.grids {
            let (Some(table), Some(range)) = (&grid.table, metrics::table_range(grid, month)?) else {
                continue;
            };
            match table.delete_rows {
                Some([start, end]) => {
                    tracing::info!(
                        "Copying {} data with deletion of rows {}-{}...",
                        grid.sheet,
                        start,
                        end
                    );
                    composer.insert_table_with_deletion(
                        &mut workbook,
                        &grid.sheet,
                        &range,
                        (start, end),
                        &table.placeholder,
                    );
                }
                None => {
                    tracing::info!("Copying {} data...", grid.sheet);
                    composer.insert_table(&workbook, &grid.sheet, &range, &table.placeholder);
                }
            }
        }

        for rule in &self.config.emphasis {
            match rule.standalone_occurrence {
                Some(occurrence) => {
                    composer.emphasize_standalone(&rule.text, occurrence, rule.style);
                }
                None => {
                    composer.emphasize_text(&rule.text, rule.style);
                }
            }
        }

        composer.append_signature(&self.signature);
        let report = composer.finish();

        Ok(ComposedReport {
            draft: EmailDraft {
                subject: self.config.report.subject.clone(),
                body,
            },
            report,
        })
    }

    async fn load(&self, composed: ComposedReport) -> Result<String> {
        let filename = self.config.output_filename(self.year, self.month);
        let html = render::render_html(&composed.draft);
        let output_path = self.storage.write_file(&filename, html.as_bytes()).await?;

        // 組裝摘要與草稿放在一起，方便排程檢查
        let summary = serde_json::to_vec_pretty(&composed.report)?;
        self.storage
            .write_file(&format!("{}.report.json", filename), &summary)
            .await?;

        tracing::debug!("Draft written: {} bytes", html.len());
        Ok(output_path)
    }
}
