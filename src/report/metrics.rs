use crate::config::toml_config::{GridConfig, ReadMode};
use crate::domain::model::{MetricMap, MetricValue};
use crate::grid::{coord, RangeRef, Workbook};
use crate::report::resolver::{self, Lookup};
use crate::utils::error::Result;

/// 當月資料所在欄 (起始欄 + 月份)
pub fn target_column(grid: &GridConfig, month: u32) -> Result<u32> {
    coord::column_label_to_index(&coord::end_column(&grid.base_column, month)?)
}

/// 表格範圍：起始欄到當月欄，列數依設定
pub fn table_range(grid: &GridConfig, month: u32) -> Result<Option<RangeRef>> {
    match &grid.table {
        Some(table) => {
            let end = coord::end_column(&grid.base_column, month)?;
            RangeRef::from_columns(&grid.base_column, &end, table.start_row, table.end_row).map(Some)
        }
        None => Ok(None),
    }
}

/// 依設定順序擷取所有指標。
///
/// A missing worksheet is fatal; a label that cannot be found (or read) only
/// leaves its metric out of the map.
pub fn extract_metrics(
    workbook: &Workbook,
    grids: &[GridConfig],
    window: &RangeRef,
    month: u32,
) -> Result<MetricMap> {
    let mut metrics = MetricMap::new();

    for grid in grids {
        let sheet = workbook.sheet(&grid.sheet)?;
        let column = target_column(grid, month)?;
        tracing::debug!(
            "Extracting {} metrics from '{}' column {}",
            grid.metrics.len(),
            grid.sheet,
            coord::index_to_column_label(column)?
        );

        for metric in &grid.metrics {
            let cell = match resolver::resolve(sheet, &metric.label, window, column) {
                Lookup::Found(cell) => cell,
                Lookup::NotFound | Lookup::Failed(_) => continue,
            };
            let value = match metric.read {
                ReadMode::Value => MetricValue::Value(resolver::read_value(sheet, cell)),
                ReadMode::Text => MetricValue::Text(resolver::read_text(sheet, cell)),
            };
            tracing::debug!("{} = {:?} ({})", metric.key, value, cell);
            metrics.insert(metric.key.clone(), value);
        }
    }

    Ok(metrics)
}
