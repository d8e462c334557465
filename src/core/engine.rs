use crate::core::Pipeline;
use crate::document::compose::ComposeReport;
use crate::domain::model::Extraction;
use crate::utils::error::Result;

/// 一次執行的結果：草稿路徑與組裝摘要
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub report: ComposeReport,
}

pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("Starting report process...");

        // Extract
        tracing::info!("📥 Reading workbook...");
        let extraction = self.pipeline.extract().await?;
        tracing::info!("Extracted {} metrics", extraction.metrics.len());

        // Transform
        tracing::info!("📝 Composing email draft...");
        let composed = self.pipeline.transform(extraction).await?;
        let report = composed.report.clone();
        tracing::info!(
            "Inserted {} of {} tables",
            report.inserted_tables(),
            report.tables.len()
        );

        // Load
        tracing::info!("💾 Writing draft...");
        let output_path = self.pipeline.load(composed).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(RunOutcome {
            output_path,
            report,
        })
    }

    /// 只執行擷取階段 (dry run)
    pub async fn preview(&self) -> Result<Extraction> {
        tracing::info!("🔍 Extracting metrics only");
        self.pipeline.extract().await
    }
}
