use crate::document::model::{Paragraph, Run};
use crate::domain::ports::SignatureSource;
use crate::utils::error::{ReportError, Result};
use std::path::PathBuf;

/// 從文字檔讀取簽名檔；`**文字**` 整行為粗體
#[derive(Debug, Clone, Default)]
pub struct FileSignature {
    path: Option<PathBuf>,
}

impl FileSignature {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

fn parse_line(line: &str) -> Paragraph {
    let trimmed = line.trim_end();
    match trimmed
        .strip_prefix("**")
        .and_then(|rest| rest.strip_suffix("**"))
    {
        Some(inner) if !inner.is_empty() => Paragraph::blank().with_run(Run {
            text: inner.to_string(),
            bold: true,
            ..Default::default()
        }),
        _ => Paragraph::new(trimmed),
    }
}

impl SignatureSource for FileSignature {
    fn signature(&self) -> Result<Option<Vec<Paragraph>>> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Err(ReportError::SourceNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        Ok(Some(content.lines().map(parse_line).collect()))
    }
}
