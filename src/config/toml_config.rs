use crate::document::model::Emphasis;
use crate::grid::RangeRef;
use crate::report::format::FormatKind;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default = "default_grids")]
    pub grids: Vec<GridConfig>,
    #[serde(default = "default_emphasis")]
    pub emphasis: Vec<EmphasisConfig>,
    pub signature: Option<SignatureConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub name: String,
    pub subject: String,
    /// 自訂郵件範本；未設定時使用內建範本
    pub template_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub directory: String,
    /// `{year}` 與 `{month}` (兩位數) 會被替換
    pub file_pattern: String,
    pub search_window: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub key: String,
    pub sheet: String,
    /// 月份偏移的起始欄 (目標欄 = 起始欄 + 月份)
    pub base_column: String,
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
    pub table: Option<TableConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    #[default]
    Value,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub read: ReadMode,
    pub format: FormatKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub placeholder: String,
    pub start_row: u32,
    pub end_row: u32,
    /// 複製後刪除的列 (原工作表座標)
    pub delete_rows: Option<[u32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmphasisConfig {
    pub text: String,
    pub style: Emphasis,
    /// 只套用在第 N 個獨立成行的出現處
    pub standalone_occurrence: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
    pub filename_pattern: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            name: "performance-weekly".to_string(),
            subject: "(週報)績效數字統計".to_string(),
            template_path: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_pattern: "{year}統計({year}{month}).xlsx".to_string(),
            search_window: "A1:Z100".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./output".to_string(),
            filename_pattern: "performance_{year}{month}.html".to_string(),
        }
    }
}

fn metric(key: &str, label: &str, read: ReadMode, format: FormatKind) -> MetricConfig {
    MetricConfig {
        key: key.to_string(),
        label: label.to_string(),
        read,
        format,
    }
}

fn default_grids() -> Vec<GridConfig> {
    vec![
        GridConfig {
            key: "digital_account".to_string(),
            sheet: "數位戶".to_string(),
            base_column: "Q".to_string(),
            metrics: vec![
                metric("digital_month_target", "月目標數", ReadMode::Value, FormatKind::Count),
                metric("digital_actual", "數位戶實績(存戶+卡戶)", ReadMode::Value, FormatKind::Count),
                metric("digital_achievement_rate", "月目標達成率", ReadMode::Text, FormatKind::Percent),
            ],
            table: Some(TableConfig {
                placeholder: "[TABLE1_PLACEHOLDER]".to_string(),
                start_row: 50,
                end_row: 60,
                delete_rows: None,
            }),
        },
        GridConfig {
            key: "digital_platform".to_string(),
            sheet: "數位平台收益".to_string(),
            base_column: "P".to_string(),
            metrics: vec![
                metric("platform_month_target", "月目標數", ReadMode::Value, FormatKind::Currency),
                metric("platform_actual", "實際數位平台收益", ReadMode::Value, FormatKind::Currency),
                metric("platform_achievement_rate", "月目標達成率", ReadMode::Text, FormatKind::Percent),
                metric("platform_cumulative_target", "累積月目標數", ReadMode::Value, FormatKind::Currency),
                metric("platform_cumulative_actual", "累積月實際數", ReadMode::Value, FormatKind::Currency),
                metric("platform_cumulative_rate", "累積月目標達成率", ReadMode::Text, FormatKind::Percent),
            ],
            table: Some(TableConfig {
                placeholder: "[TABLE2_PLACEHOLDER]".to_string(),
                start_row: 11,
                end_row: 41,
                delete_rows: Some([23, 31]),
            }),
        },
    ]
}

fn default_emphasis() -> Vec<EmphasisConfig> {
    vec![
        EmphasisConfig {
            text: "網行銀客戶數(具有網行銀會員身分之存戶+卡戶)".to_string(),
            style: Emphasis::Bold,
            standalone_occurrence: None,
        },
        EmphasisConfig {
            text: "數位平台收益".to_string(),
            style: Emphasis::Bold,
            standalone_occurrence: Some(2),
        },
        EmphasisConfig {
            text: "(1) 數位戶客戶數:".to_string(),
            style: Emphasis::Underline,
            standalone_occurrence: None,
        },
        EmphasisConfig {
            text: "(2)數位平台收益:".to_string(),
            style: Emphasis::Underline,
            standalone_occurrence: None,
        },
    ]
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report: ReportSection::default(),
            source: SourceConfig::default(),
            grids: default_grids(),
            emphasis: default_emphasis(),
            signature: None,
            output: OutputConfig::default(),
        }
    }
}

fn expand_period(pattern: &str, year: i32, month: u32) -> String {
    pattern
        .replace("{year}", &year.to_string())
        .replace("{month}", &format!("{:02}", month))
}

impl ReportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${REPORT_DIR})
    fn substitute_env_vars(content: &str) -> String {
        use once_cell::sync::Lazy;
        use regex::Regex;
        static ENV_VAR: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn search_window(&self) -> Result<RangeRef> {
        RangeRef::parse(&self.source.search_window)
    }

    /// 報表檔案路徑，例如 `\\X.X.X.X\2025統計(202503).xlsx`
    pub fn workbook_path(&self, year: i32, month: u32) -> PathBuf {
        Path::new(&self.source.directory).join(expand_period(&self.source.file_pattern, year, month))
    }

    pub fn output_filename(&self, year: i32, month: u32) -> String {
        expand_period(&self.output.filename_pattern, year, month)
    }

    pub fn grid(&self, key: &str) -> Option<&GridConfig> {
        self.grids.iter().find(|grid| grid.key == key)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("report.subject", &self.report.subject)?;
        validation::validate_path("source.directory", &self.source.directory)?;
        validation::validate_non_empty_string("source.file_pattern", &self.source.file_pattern)?;
        validation::validate_path("output.directory", &self.output.directory)?;
        validation::validate_non_empty_string(
            "output.filename_pattern",
            &self.output.filename_pattern,
        )?;

        self.search_window()
            .map_err(|_| ReportError::InvalidConfigValueError {
                field: "source.search_window".to_string(),
                value: self.source.search_window.clone(),
                reason: "Expected an A1 range such as A1:Z100".to_string(),
            })?;

        if self.grids.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "grids".to_string(),
            });
        }

        let mut keys = HashSet::new();
        let mut placeholders = HashSet::new();
        for grid in &self.grids {
            let field = format!("grids.{}", grid.key);
            validation::validate_non_empty_string(&format!("{}.sheet", field), &grid.sheet)?;
            validation::validate_column_label(&format!("{}.base_column", field), &grid.base_column)?;

            for metric in &grid.metrics {
                if !keys.insert(metric.key.clone()) {
                    return Err(ReportError::InvalidConfigValueError {
                        field: format!("{}.metrics", field),
                        value: metric.key.clone(),
                        reason: "Metric keys must be unique".to_string(),
                    });
                }
                validation::validate_non_empty_string(
                    &format!("{}.metrics.{}.label", field, metric.key),
                    &metric.label,
                )?;
            }

            if let Some(table) = &grid.table {
                validation::validate_non_empty_string(
                    &format!("{}.table.placeholder", field),
                    &table.placeholder,
                )?;
                if !placeholders.insert(table.placeholder.clone()) {
                    return Err(ReportError::InvalidConfigValueError {
                        field: format!("{}.table.placeholder", field),
                        value: table.placeholder.clone(),
                        reason: "Each table needs its own placeholder".to_string(),
                    });
                }
                if table.start_row == 0 || table.start_row > table.end_row {
                    return Err(ReportError::InvalidConfigValueError {
                        field: format!("{}.table", field),
                        value: format!("{}-{}", table.start_row, table.end_row),
                        reason: "start_row must be >= 1 and <= end_row".to_string(),
                    });
                }
                if let Some([start, end]) = table.delete_rows {
                    validation::validate_deletion_rows(
                        &format!("{}.table.delete_rows", field),
                        (start, end),
                        table.start_row,
                        table.end_row,
                    )?;
                }
            }
        }

        for emphasis in &self.emphasis {
            validation::validate_non_empty_string("emphasis.text", &emphasis.text)?;
            if emphasis.standalone_occurrence == Some(0) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "emphasis.standalone_occurrence".to_string(),
                    value: "0".to_string(),
                    reason: "Occurrences are counted from 1".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grids.len(), 2);
        assert_eq!(config.grid("digital_platform").unwrap().base_column, "P");
    }

    #[test]
    fn test_parse_partial_toml_uses_defaults() {
        let toml_content = r#"
[report]
name = "weekly"
subject = "績效"

[source]
directory = "/data/reports"
file_pattern = "{year}統計({year}{month}).xlsx"
search_window = "A1:Z200"
"#;

        let config = ReportConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.report.subject, "績效");
        assert_eq!(config.grids.len(), 2);
        assert_eq!(config.emphasis.len(), 4);
        assert_eq!(
            config.workbook_path(2025, 3),
            PathBuf::from("/data/reports/2025統計(202503).xlsx")
        );
    }

    #[test]
    fn test_parse_custom_grid() {
        let toml_content = r#"
[[grids]]
key = "accounts"
sheet = "Accounts"
base_column = "C"

[[grids.metrics]]
key = "target"
label = "Target"
format = "count"

[[grids.metrics]]
key = "rate"
label = "Rate"
read = "text"
format = "percent"

[grids.table]
placeholder = "[ACCOUNTS]"
start_row = 5
end_row = 20
delete_rows = [8, 10]

[[emphasis]]
text = "Accounts"
style = "underline"
"#;

        let config = ReportConfig::from_toml_str(toml_content).unwrap();
        let grid = config.grid("accounts").unwrap();
        assert_eq!(grid.metrics[1].read, ReadMode::Text);
        assert_eq!(grid.metrics[1].format, FormatKind::Percent);
        assert_eq!(grid.table.as_ref().unwrap().delete_rows, Some([8, 10]));
        assert_eq!(config.emphasis[0].style, Emphasis::Underline);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KPI_REPORT_TEST_DIR", "/mnt/share");

        let toml_content = r#"
[source]
directory = "${KPI_REPORT_TEST_DIR}"
file_pattern = "{year}.xlsx"
search_window = "A1:Z100"
"#;

        let config = ReportConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.directory, "/mnt/share");

        std::env::remove_var("KPI_REPORT_TEST_DIR");
    }

    #[test]
    fn test_config_validation_rejects_bad_deletion_rows() {
        let mut config = ReportConfig::default();
        if let Some(table) = config.grids[1].table.as_mut() {
            table.delete_rows = Some([5, 31]);
        }
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.grids[0].base_column = "Q1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[output]
directory = "./drafts"
filename_pattern = "draft_{month}.html"
"#;
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = ReportConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.directory, "./drafts");
        assert_eq!(config.output_filename(2025, 7), "draft_07.html");
    }
}
