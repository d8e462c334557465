pub mod config;
pub mod core;
pub mod document;
pub mod domain;
pub mod grid;
pub mod report;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, ReportConfig};

pub use core::{engine::ReportEngine, report_pipeline::ReportPipeline};
pub use utils::error::{ReportError, Result};
