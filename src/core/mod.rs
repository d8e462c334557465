pub mod engine;
pub mod report_pipeline;

pub use crate::domain::model::{ComposedReport, Extraction};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
