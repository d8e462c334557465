use crate::config::toml_config::{ReportConfig, SignatureConfig};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "kpi-report")]
#[command(about = "Builds the weekly KPI email draft from the monthly statistics workbook")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Report month 1-12 (prompted when omitted)
    #[arg(short, long)]
    pub month: Option<u32>,

    /// Report year (defaults to the current year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Directory holding the statistics workbooks
    #[arg(long)]
    pub source_dir: Option<String>,

    /// Explicit workbook path, bypassing the file pattern
    #[arg(long)]
    pub workbook: Option<String>,

    /// Output directory for the draft
    #[arg(short, long)]
    pub output: Option<String>,

    /// Signature text file appended to the draft
    #[arg(long)]
    pub signature: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    /// Dry run - show what would be extracted without writing the draft
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// 載入 TOML 配置 (或內建預設) 並套用命令列覆蓋
    pub fn load_report_config(&self) -> Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::from_file(path)?,
            None => ReportConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ReportConfig) {
        if let Some(dir) = &self.source_dir {
            tracing::info!("🔧 Source directory overridden to: {}", dir);
            config.source.directory = dir.clone();
        }
        if let Some(dir) = &self.output {
            tracing::info!("🔧 Output directory overridden to: {}", dir);
            config.output.directory = dir.clone();
        }
        if let Some(path) = &self.signature {
            config.signature = Some(SignatureConfig { path: path.clone() });
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(month) = self.month {
            validation::validate_range("month", month, 1, 12)?;
        }
        if let Some(year) = self.year {
            validation::validate_range("year", year, 1900, 9999)?;
        }
        if let Some(path) = &self.workbook {
            validation::validate_path("workbook", path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_and_overrides() {
        let cli = CliConfig::parse_from([
            "kpi-report",
            "--month",
            "3",
            "--source-dir",
            "/mnt/share",
            "--output",
            "./drafts",
            "--signature",
            "SIGN.txt",
            "--dry-run",
        ]);
        assert_eq!(cli.month, Some(3));
        assert!(cli.dry_run);
        assert!(cli.validate().is_ok());

        let config = cli.load_report_config().unwrap();
        assert_eq!(config.source.directory, "/mnt/share");
        assert_eq!(config.output.directory, "./drafts");
        assert_eq!(config.signature.unwrap().path, "SIGN.txt");
    }

    #[test]
    fn test_month_out_of_range() {
        let cli = CliConfig::parse_from(["kpi-report", "--month", "13"]);
        assert!(cli.validate().is_err());
    }
}
