use crate::grid::coord;
use crate::utils::error::{ReportError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_column_label(field_name: &str, label: &str) -> Result<()> {
    coord::column_label_to_index(label)
        .map(|_| ())
        .map_err(|_| ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: label.to_string(),
            reason: "Column label must consist of letters A-Z".to_string(),
        })
}

/// 刪除列必須落在表格列範圍內: start_row <= start <= end <= end_row
pub fn validate_deletion_rows(
    field_name: &str,
    rows: (u32, u32),
    block_start: u32,
    block_end: u32,
) -> Result<()> {
    let (start, end) = rows;
    if start > end || start < block_start || end > block_end {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}-{}", start, end),
            reason: format!("Rows must fall inside table rows {}-{}", block_start, block_end),
        });
    }
    Ok(())
}
