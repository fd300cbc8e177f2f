pub mod reader;
pub mod table;

pub use reader::WorkbookReader;
pub use table::{CellValue, SourceRow, SourceTable};
