// Grid layer: coordinates, cells, sheets, the workbook session and file loaders.

pub mod coord;
pub mod formula;
pub mod loader;
pub mod sheet;
pub mod workbook;
pub mod xlsx_styles;

pub use coord::{CellRef, RangeRef};
pub use sheet::{Cell, CellStyle, CellValue, Sheet};
pub use workbook::{PasteMode, Workbook};
