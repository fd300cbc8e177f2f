use crate::error::{Result, SqlSheetError};
use crate::workbook::table::{CellValue, SourceTable};
use calamine::{open_workbook, Data, Range, Reader, Xlsx, XlsxError};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Read access to one `.xlsx` document.
pub struct WorkbookReader {
    path: PathBuf,
    workbook: Xlsx<BufReader<File>>,
}

impl WorkbookReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let workbook: Xlsx<BufReader<File>> =
            open_workbook(&path).map_err(|e: XlsxError| SqlSheetError::Workbook {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { path, workbook })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// Reads `sheet_name` into a table. The first row of the used range is the header.
    pub fn read_table(&mut self, sheet_name: &str) -> Result<SourceTable> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| SqlSheetError::Workbook {
                path: self.path.display().to_string(),
                message: format!("sheet '{}': {}", sheet_name, e),
            })?;

        Ok(table_from_range(&range))
    }
}

fn table_from_range(range: &Range<Data>) -> SourceTable {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return SourceTable::default(),
    };

    let data_rows = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    SourceTable::from_rows(headers, data_rows)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Int(number) => CellValue::Number(*number as f64),
        Data::Float(number) => CellValue::Number(*number),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::Empty => CellValue::Empty,
        other => CellValue::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;
    use tempfile::TempDir;

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_value(&Data::String("x".into())), CellValue::text("x"));
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_value(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert!(matches!(
            cell_value(&Data::Error(CellErrorType::Div0)),
            CellValue::Other(_)
        ));
    }

    #[test]
    fn test_table_from_range() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String(" Item Name".into()));
        range.set_value((0, 1), Data::String("SQL".into()));
        range.set_value((1, 0), Data::String("GetTotals".into()));
        range.set_value((1, 1), Data::String("SELECT 1;".into()));
        range.set_value((2, 1), Data::Float(4.0));

        let table = table_from_range(&range);
        assert_eq!(table.headers, vec!["Item Name", "SQL"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].get("Item Name"), Some(&CellValue::Empty));
        assert_eq!(table.rows[1].get("SQL"), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_empty_range() {
        let range: Range<Data> = Range::empty();
        let table = table_from_range(&range);
        assert!(table.headers.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_open_rejects_non_workbook() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.xlsx");
        std::fs::write(&path, "not a zip archive").unwrap();

        let result = WorkbookReader::open(&path);
        assert!(matches!(result, Err(SqlSheetError::Workbook { .. })));
    }

    #[test]
    fn test_open_and_read_saved_workbook() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Sales.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("SQL Statements").unwrap();
        worksheet.write_string(0, 0, "Item Name").unwrap();
        worksheet.write_string(0, 1, "SQL").unwrap();
        worksheet.write_string(1, 0, "GetTotals").unwrap();
        worksheet.write_string(1, 1, "SELECT 1;").unwrap();
        workbook.save(&path).unwrap();

        let mut reader = WorkbookReader::open(&path).unwrap();
        assert_eq!(reader.path(), path.as_path());
        assert_eq!(reader.sheet_names(), vec!["SQL Statements".to_string()]);

        let table = reader.read_table("SQL Statements").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get("SQL"), Some(&CellValue::text("SELECT 1;")));
    }
}
