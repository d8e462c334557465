use crate::config::toml_config::ReportConfig;
use crate::grid::{loader, Workbook};
use crate::utils::error::{ReportError, Result};
use chrono::Datelike;
use std::path::{Path, PathBuf};

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// 每月統計活頁簿的位置
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    path: PathBuf,
}

impl WorkbookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path built from the configured directory and file pattern.
    pub fn from_config(config: &ReportConfig, year: i32, month: u32) -> Self {
        Self::new(config.workbook_path(year, month))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the workbook and checks that every `required` sheet is present.
    pub fn open(&self, required: &[&str]) -> Result<Workbook> {
        if !self.path.exists() {
            tracing::error!("File not found: {}", self.path.display());
            return Err(ReportError::SourceNotFound {
                path: self.path.display().to_string(),
            });
        }

        let workbook = loader::load_workbook(&self.path)?;
        for name in required {
            if !workbook.has_sheet(name) {
                tracing::error!(
                    "Worksheet '{}' not found; available: {}",
                    name,
                    workbook.sheet_names().join(", ")
                );
                return Err(ReportError::SheetNotFound {
                    name: name.to_string(),
                });
            }
        }

        tracing::info!(
            "📊 Opened {} ({} sheets)",
            self.path.display(),
            workbook.sheet_names().len()
        );
        Ok(workbook)
    }
}
