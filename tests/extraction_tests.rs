//! End-to-end extraction over generated workbooks.

use rust_xlsxwriter::{Workbook, XlsxError};
use sqlsheet::{
    Config, DocumentOutcome, GracefulShutdown, OutputMode, SqlSheet, SqlSheetError,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

mod fixtures {
    use super::*;

    /// `rows` are `(name, content)`; `None` leaves the cell empty.
    pub fn write_statements(
        path: &Path,
        sheet: &str,
        headers: (&str, &str),
        rows: &[(Option<&str>, Option<&str>)],
    ) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();

        let cover = workbook.add_worksheet();
        cover.set_name("Cover")?;
        cover.write_string(0, 0, "Generated for tests")?;

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet)?;
        worksheet.write_string(0, 0, headers.0)?;
        worksheet.write_string(0, 1, headers.1)?;

        for (i, (name, content)) in rows.iter().enumerate() {
            let row = (i + 1) as u32;
            if let Some(name) = name {
                worksheet.write_string(row, 0, *name)?;
            }
            if let Some(content) = content {
                worksheet.write_string(row, 1, *content)?;
            }
        }

        workbook.save(path)
    }

    pub fn write_sales(path: &Path) -> Result<(), XlsxError> {
        write_statements(
            path,
            "SQL Statements",
            ("Item Name", "SQL"),
            &[
                (Some("GetTotals"), Some("SELECT 1;")),
                (Some("GetTotals"), Some("SELECT 2;")),
                (None, Some("SELECT 3;")),
            ],
        )
    }

    pub fn write_numeric_content(path: &Path) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("SQL Statements")?;
        worksheet.write_string(0, 0, "Item Name")?;
        worksheet.write_string(0, 1, "SQL")?;
        worksheet.write_string(1, 0, "Numeric")?;
        worksheet.write_number(1, 1, 42.0)?;
        worksheet.write_number(2, 0, 7.0)?;
        worksheet.write_string(2, 1, "SELECT 7;")?;
        workbook.save(path)
    }
}

fn instance(input: &Path, output: &Path) -> SqlSheet {
    let mut config = Config::default();
    config.output.input_folder = Some(input.to_path_buf());
    config.output.output_folder = Some(output.to_path_buf());

    SqlSheet::with_shutdown(
        config,
        OutputMode::Plain,
        0,
        true,
        GracefulShutdown::new_for_test(),
    )
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("workbooks");
    let output = temp_dir.path().join("sql");
    fs::create_dir(&input).unwrap();
    (temp_dir, input, output)
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[test]
fn test_sales_workbook_layout() {
    let (_temp, input, output) = setup();
    fixtures::write_sales(&input.join("Sales.xlsx")).unwrap();

    let report = instance(&input, &output).extract().unwrap();

    assert_eq!(report.summary.documents_extracted, 1);
    assert_eq!(report.summary.files_written, 3);
    assert_eq!(read(output.join("Sales/GetTotals.sql")), "SELECT 1;");
    assert_eq!(read(output.join("Sales/GetTotals_2.sql")), "SELECT 2;");
    assert_eq!(read(output.join("Sales/Query_2.sql")), "SELECT 3;");
}

#[test]
fn test_document_folder_keeps_file_stem() {
    let (_temp, input, output) = setup();
    fixtures::write_sales(&input.join("Sales Report.xlsx")).unwrap();

    let report = instance(&input, &output).extract().unwrap();

    assert_eq!(report.summary.files_written, 3);
    assert!(output.join("Sales Report").is_dir());
    assert!(!output.join("Sales_Report").exists());
    assert_eq!(
        read(output.join("Sales Report").join("GetTotals.sql")),
        "SELECT 1;"
    );
}

#[test]
fn test_content_is_written_verbatim() {
    let (_temp, input, output) = setup();
    let body = "  SELECT a,\n         b\n  FROM t -- trailing\n\n";
    fixtures::write_statements(
        &input.join("Verbatim.xlsx"),
        "SQL Statements",
        ("Item Name", "SQL"),
        &[(Some("Multi/Line: query?"), Some(body))],
    )
    .unwrap();

    instance(&input, &output).extract().unwrap();

    assert_eq!(read(output.join("Verbatim/Multi_Line__query_.sql")), body);
}

#[test]
fn test_inexact_sheet_name_is_skipped() {
    let (_temp, input, output) = setup();
    fixtures::write_statements(
        &input.join("Legacy.xlsx"),
        "SQL",
        ("Item Name", "SQL"),
        &[(Some("Orphan"), Some("SELECT 1;"))],
    )
    .unwrap();

    let report = instance(&input, &output).extract().unwrap();

    assert_eq!(report.summary.documents_skipped, 1);
    assert_eq!(report.summary.files_written, 0);
    assert!(matches!(
        report.documents[0].outcome,
        DocumentOutcome::Skipped { .. }
    ));
    assert!(!output.join("Legacy").exists());
}

#[test]
fn test_missing_columns_skip_document() {
    let (_temp, input, output) = setup();
    fixtures::write_statements(
        &input.join("Renamed.xlsx"),
        "SQL Statements",
        ("Name", "Query"),
        &[(Some("A"), Some("SELECT 1;"))],
    )
    .unwrap();

    let report = instance(&input, &output).extract().unwrap();

    assert_eq!(report.summary.documents_skipped, 1);
    assert!(!output.join("Renamed").exists());
}

#[test]
fn test_blank_and_non_text_rows() {
    let (_temp, input, output) = setup();
    fixtures::write_statements(
        &input.join("Gaps.xlsx"),
        "SQL Statements",
        ("Item Name", "SQL"),
        &[
            (Some("Empty"), None),
            (Some("Spaces"), Some("   ")),
            (Some("Real"), Some("SELECT 1;")),
        ],
    )
    .unwrap();
    fixtures::write_numeric_content(&input.join("Numbers.xlsx")).unwrap();

    let report = instance(&input, &output).extract().unwrap();

    let gaps = report
        .documents
        .iter()
        .find(|d| d.document == "Gaps.xlsx")
        .unwrap();
    assert_eq!(gaps.files.len(), 1);
    assert_eq!(gaps.skipped_rows.len(), 2);
    assert!(output.join("Gaps/Real.sql").exists());
    assert!(!output.join("Gaps/Empty.sql").exists());

    let numbers = report
        .documents
        .iter()
        .find(|d| d.document == "Numbers.xlsx")
        .unwrap();
    assert_eq!(numbers.skipped_rows.len(), 1);
    assert!(!output.join("Numbers/Numeric.sql").exists());
    assert_eq!(read(output.join("Numbers/Query_1.sql")), "SELECT 7;");
    assert!(numbers.warnings.len() >= 2);
}

#[test]
fn test_corrupt_workbook_does_not_stop_batch() {
    let (_temp, input, output) = setup();
    fs::write(input.join("Broken.xlsx"), b"this is not a zip archive").unwrap();
    fixtures::write_sales(&input.join("Sales.xlsx")).unwrap();

    let report = instance(&input, &output).extract().unwrap();

    assert_eq!(report.summary.documents_seen, 2);
    assert_eq!(report.summary.documents_failed, 1);
    assert_eq!(report.summary.documents_extracted, 1);
    assert!(report.has_errors());
    assert!(output.join("Sales/GetTotals.sql").exists());
    assert!(!output.join("Broken").exists());
}

#[test]
fn test_lock_files_and_other_extensions_ignored() {
    let (_temp, input, output) = setup();
    fixtures::write_sales(&input.join("Sales.xlsx")).unwrap();
    fs::write(input.join("~$Sales.xlsx"), b"lock").unwrap();
    fs::write(input.join("notes.txt"), b"ignore me").unwrap();

    let report = instance(&input, &output).extract().unwrap();

    assert_eq!(report.summary.documents_seen, 1);
    assert_eq!(report.summary.documents_failed, 0);
}

#[test]
fn test_rerun_is_deterministic() {
    let (temp, input, first) = setup();
    fixtures::write_sales(&input.join("Sales.xlsx")).unwrap();
    fixtures::write_statements(
        &input.join("Inventory.xlsx"),
        "SQL Statements",
        ("Item Name", "SQL"),
        &[
            (Some("stock"), Some("SELECT * FROM stock;")),
            (Some("STOCK"), Some("SELECT count(*) FROM stock;")),
        ],
    )
    .unwrap();
    let second = temp.path().join("sql_again");

    instance(&input, &first).extract().unwrap();
    instance(&input, &second).extract().unwrap();

    let listing = |root: &Path| {
        let mut entries: Vec<(PathBuf, String)> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                (
                    e.path().strip_prefix(root).unwrap().to_path_buf(),
                    fs::read_to_string(e.path()).unwrap(),
                )
            })
            .collect();
        entries.sort();
        entries
    };

    let first_listing = listing(&first);
    assert_eq!(first_listing.len(), 5);
    assert_eq!(first_listing, listing(&second));
    assert!(first.join("Inventory/STOCK_2.sql").exists());
}

#[test]
fn test_missing_input_folder() {
    let temp_dir = TempDir::new().unwrap();
    let result = instance(&temp_dir.path().join("absent"), &temp_dir.path().join("out")).extract();

    assert!(matches!(result, Err(SqlSheetError::InputNotFound { .. })));
}
