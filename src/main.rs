use clap::Parser;
use kpi_report::config::toml_config::ReportConfig;
use kpi_report::report::source::{self, WorkbookSource};
use kpi_report::report::{format::FormatKind, metrics};
use kpi_report::utils::error::{ErrorSeverity, ReportError};
use kpi_report::utils::{logger, validation::Validate};
use kpi_report::{CliConfig, LocalStorage, ReportEngine, ReportPipeline};
use std::io::{self, BufRead, Write};

/// 互動式輸入月份，直到輸入 1-12
fn prompt_month() -> io::Result<u32> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("請輸入月份 (1-12): ");
        io::stdout().flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "no month entered",
                ))
            }
        };
        match line.trim().parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => return Ok(month),
            Ok(_) => println!("請輸入 1 到 12 之間的數字"),
            Err(_) => println!("請輸入有效的數字"),
        }
    }
}

fn exit_code(e: &ReportError) -> i32 {
    // 根據錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 處理錯誤
        ErrorSeverity::High => 1,     // 來源或設定錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn fail(e: &ReportError) -> ! {
    tracing::error!(
        "❌ Report failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e));
}

fn display_config_summary(config: &ReportConfig, source: &WorkbookSource, month: u32, dry_run: bool) {
    println!("📋 Configuration Summary:");
    println!("  Report: {}", config.report.name);
    println!("  Subject: {}", config.report.subject);
    println!("  Month: {:02}", month);
    println!("  Workbook: {}", source.path().display());
    println!("  Search window: {}", config.source.search_window);
    println!("  Output: {}", config.output.directory);
    match &config.signature {
        Some(signature) => println!("  Signature: {}", signature.path),
        None => println!("  Signature: (none)"),
    }
    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

async fn perform_dry_run(
    engine: &ReportEngine<ReportPipeline<LocalStorage>>,
) -> Result<(), ReportError> {
    let pipeline = engine.pipeline();
    let config = pipeline.config();
    let month = pipeline.month();

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📊 Grids:");
    for grid in &config.grids {
        let column = metrics::target_column(grid, month)?;
        println!(
            "  {} (base {}): target column {}",
            grid.sheet,
            grid.base_column,
            kpi_report::grid::coord::index_to_column_label(column)?
        );
        if let (Some(table), Some(range)) = (&grid.table, metrics::table_range(grid, month)?) {
            match table.delete_rows {
                Some([start, end]) => println!(
                    "    Table {} → {} (delete rows {}-{})",
                    range, table.placeholder, start, end
                ),
                None => println!("    Table {} → {}", range, table.placeholder),
            }
        }
    }

    let extraction = engine.preview().await?;
    println!();
    println!("🔢 Extracted metrics:");
    for grid in &config.grids {
        for metric in &grid.metrics {
            let value = extraction.metrics.get(&metric.key);
            let rendered = match value {
                Some(_) => metric.format.format(value),
                None => format!("{} (not found)", metric.format.default_text()),
            };
            let kind = match metric.format {
                FormatKind::Count => "count",
                FormatKind::Currency => "currency",
                FormatKind::Percent => "percent",
            };
            println!("  {:<28} {:<10} {}", metric.key, kind, rendered);
        }
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting kpi-report");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證命令列參數
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    if let Some(path) = &cli.config {
        tracing::info!("📁 Loading configuration from: {}", path);
    }
    let config = match cli.load_report_config() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    let month = match cli.month {
        Some(month) => month,
        None => prompt_month()?,
    };
    let year = cli.year.unwrap_or_else(source::current_year);
    tracing::info!("Processing data for month: {:02} ({})", month, year);

    let workbook_source = match &cli.workbook {
        Some(path) => WorkbookSource::new(path),
        None => WorkbookSource::from_config(&config, year, month),
    };

    display_config_summary(&config, &workbook_source, month, cli.dry_run);

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output.directory.clone());
    let pipeline = ReportPipeline::new(storage, config, workbook_source, year, month);
    let engine = ReportEngine::new(pipeline);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No draft will be written");
        if let Err(e) = perform_dry_run(&engine).await {
            fail(&e);
        }
        return Ok(());
    }

    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Email draft created successfully!");
            tracing::info!("📁 Output saved to: {}", outcome.output_path);
            println!("✅ Email draft created successfully!");
            println!("📁 Output saved to: {}", outcome.output_path);
            for table in &outcome.report.tables {
                println!("  {} → {:?}", table.placeholder, table.outcome);
            }
            for notice in &outcome.report.notices {
                println!("⚠ {}", notice);
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
