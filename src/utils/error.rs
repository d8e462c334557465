use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("Workbook archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Source workbook not found: {path}")]
    SourceNotFound { path: String },

    #[error("Worksheet '{name}' not found")]
    SheetNotFound { name: String },

    #[error("Worksheet '{name}' already exists")]
    SheetExists { name: String },

    #[error("Invalid column label: '{label}'")]
    InvalidLabel { label: String },

    #[error("Invalid column index: {index}")]
    InvalidIndex { index: i64 },

    #[error("Invalid cell reference: '{reference}'")]
    InvalidReference { reference: String },

    #[error("Deletion rows {start}-{end} fall outside block rows {block_start}-{block_end}")]
    InvalidDeletionRange {
        start: u32,
        end: u32,
        block_start: u32,
        block_end: u32,
    },

    #[error("Clipboard is empty")]
    ClipboardEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Source,
    Configuration,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::IoError(_) => ErrorCategory::Io,
            ReportError::WorkbookError(_)
            | ReportError::ArchiveError(_)
            | ReportError::CsvError(_)
            | ReportError::SerializationError(_)
            | ReportError::SourceNotFound { .. }
            | ReportError::SheetNotFound { .. } => ErrorCategory::Source,
            ReportError::TomlError(_)
            | ReportError::ConfigError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ReportError::SheetExists { .. }
            | ReportError::InvalidLabel { .. }
            | ReportError::InvalidIndex { .. }
            | ReportError::InvalidReference { .. }
            | ReportError::InvalidDeletionRange { .. }
            | ReportError::ClipboardEmpty => ErrorCategory::Grid,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Source | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Grid => ErrorSeverity::Medium,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReportError::SourceNotFound { path } => format!("找不到報表檔案: {}", path),
            ReportError::SheetNotFound { name } => format!("找不到工作表 '{}' (missing worksheet)", name),
            ReportError::TomlError(_)
            | ReportError::ConfigError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. } => format!("設定檔有誤: {}", self),
            ReportError::WorkbookError(e) => format!("無法讀取活頁簿: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check file permissions and available disk space",
            ErrorCategory::Source => {
                "Verify the workbook exists for the selected month and contains the expected worksheets"
            }
            ErrorCategory::Configuration => "Review the TOML configuration file",
            ErrorCategory::Grid => "Check table ranges and deletion rows in the configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// 讀取儲存格失敗 (與「找不到」不同，屬於可降級的錯誤)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadFailure {
    #[error("{reference} is outside the readable area of '{sheet}'")]
    OutOfBounds { sheet: String, reference: String },

    #[error("Worksheet '{sheet}' is unreadable: {reason}")]
    Unreadable { sheet: String, reason: String },
}
