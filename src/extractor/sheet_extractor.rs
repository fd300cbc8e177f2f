use crate::config::ExtractConfig;
use crate::error::{Result, SqlSheetError};
use crate::extractor::naming::{placeholder_name, sanitize_name, NameRegistry};
use crate::extractor::output_manager::OutputManager;
use crate::scanner::SourceDocument;
use crate::ui::GracefulShutdown;
use crate::workbook::{CellValue, SourceRow, SourceTable, WorkbookReader};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// One file to write: a path relative to the output root and its text.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputUnit {
    pub relative_path: PathBuf,
    pub content: String,
    pub row_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row_index: usize,
    pub reason: String,
}

enum RowContent {
    Text(String),
    Blank,
    NonText(&'static str),
}

/// Files planned for one sheet plus the rows left out.
#[derive(Debug, Default)]
pub struct TablePlan {
    pub units: Vec<OutputUnit>,
    pub skipped_rows: Vec<SkippedRow>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoMarkerSheet { sheet: String },
    MissingColumns { columns: Vec<String> },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoMarkerSheet { sheet } => write!(f, "no sheet named '{}'", sheet),
            SkipReason::MissingColumns { columns } => {
                write!(f, "missing column(s): {}", columns.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Extracted {
        files: usize,
        skipped_rows: usize,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub document: String,
    pub output_directory: Option<PathBuf>,
    pub outcome: DocumentOutcome,
    pub files: Vec<PathBuf>,
    pub skipped_rows: Vec<SkippedRow>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl DocumentReport {
    fn new(document: &SourceDocument) -> Self {
        Self {
            document: document.file_name.clone(),
            output_directory: None,
            outcome: DocumentOutcome::Extracted {
                files: 0,
                skipped_rows: 0,
            },
            files: Vec::new(),
            skipped_rows: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn failed(mut self, error: &SqlSheetError) -> Self {
        self.outcome = DocumentOutcome::Failed {
            error: error.to_string(),
        };
        self
    }

    fn skipped(mut self, reason: SkipReason) -> Self {
        self.outcome = DocumentOutcome::Skipped { reason };
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub documents_processed: usize,
    pub total_documents: usize,
    pub files_written: usize,
    pub current_document: Option<String>,
    pub start_time: Instant,
    pub errors: Vec<String>,
}

impl ExtractionProgress {
    pub fn new(total_documents: usize) -> Self {
        Self {
            documents_processed: 0,
            total_documents,
            files_written: 0,
            current_document: None,
            start_time: Instant::now(),
            errors: Vec::new(),
        }
    }

    pub fn update_document(&mut self, document: String, files: usize) {
        self.documents_processed += 1;
        self.files_written += files;
        self.current_document = Some(document);
    }

    pub fn add_error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    pub fn percentage(&self) -> f64 {
        if self.total_documents == 0 {
            0.0
        } else {
            (self.documents_processed as f64 / self.total_documents as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Writes one file per SQL row of the marker sheet of each workbook.
pub struct SheetToFileExtractor {
    config: ExtractConfig,
}

impl SheetToFileExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Decides file names and contents for a sheet without touching the disk.
    pub fn plan_table(&self, directory: &str, table: &SourceTable) -> TablePlan {
        let mut plan = TablePlan::default();
        let mut registry = NameRegistry::new();

        for row in &table.rows {
            let content = match self.row_content(row) {
                RowContent::Text(content) => content,
                RowContent::Blank => {
                    plan.skipped_rows.push(SkippedRow {
                        row_index: row.index,
                        reason: "blank content".to_string(),
                    });
                    continue;
                }
                RowContent::NonText(kind) => {
                    let reason = format!("{} content is not extracted", kind);
                    plan.warnings
                        .push(format!("Row {} skipped: {}", row.index, reason));
                    plan.skipped_rows.push(SkippedRow {
                        row_index: row.index,
                        reason,
                    });
                    continue;
                }
            };

            let base = self.row_base_name(row, &mut plan.warnings);
            let stem = registry.claim(&base);
            let file_name = format!("{}.{}", stem, self.config.extension);

            plan.units.push(OutputUnit {
                relative_path: PathBuf::from(directory).join(file_name),
                content,
                row_index: row.index,
            });
        }

        plan
    }

    fn row_content(&self, row: &SourceRow) -> RowContent {
        match row.get(&self.config.content_column) {
            None => RowContent::Blank,
            Some(value) if value.is_blank() => RowContent::Blank,
            Some(CellValue::Text(text)) => RowContent::Text(text.clone()),
            Some(other) => RowContent::NonText(other.kind()),
        }
    }

    fn row_base_name(&self, row: &SourceRow, warnings: &mut Vec<String>) -> String {
        let fallback = placeholder_name(row.index);

        match row.get(&self.config.name_column) {
            Some(CellValue::Text(text)) => sanitize_name(text).unwrap_or(fallback),
            None | Some(CellValue::Empty) => fallback,
            Some(other) => {
                warnings.push(format!(
                    "Row {} has a {} name '{}'; using {}",
                    row.index,
                    other.kind(),
                    other,
                    fallback
                ));
                fallback
            }
        }
    }

    /// Extracts one workbook. Errors are captured in the report, never returned.
    pub fn extract_document(
        &self,
        document: &SourceDocument,
        output: &OutputManager,
        directories: &mut NameRegistry,
    ) -> DocumentReport {
        let mut report = DocumentReport::new(document);

        let mut reader = match WorkbookReader::open(&document.path) {
            Ok(reader) => reader,
            Err(e) => {
                log::error!("{}: {}", document.display_path(), e);
                return report.failed(&e);
            }
        };

        let sheet_names = reader.sheet_names();
        let matches = sheet_names
            .iter()
            .filter(|name| **name == self.config.sheet_name)
            .count();

        if matches == 0 {
            log::info!(
                "{}: no sheet named '{}', skipping",
                document.file_name,
                self.config.sheet_name
            );
            return report.skipped(SkipReason::NoMarkerSheet {
                sheet: self.config.sheet_name.clone(),
            });
        }

        if matches > 1 {
            let warning = format!(
                "{} sheets named '{}'; only the first is extracted",
                matches, self.config.sheet_name
            );
            log::warn!("{}: {}", document.file_name, warning);
            report.warnings.push(warning);
        }

        let table = match reader.read_table(&self.config.sheet_name) {
            Ok(table) => table,
            Err(e) => {
                log::error!("{}: {}", document.display_path(), e);
                return report.failed(&e);
            }
        };

        let missing = table.missing_columns(&[
            self.config.name_column.as_str(),
            self.config.content_column.as_str(),
        ]);
        if !missing.is_empty() {
            log::info!(
                "{}: missing column(s) {}, skipping",
                document.file_name,
                missing.join(", ")
            );
            return report.skipped(SkipReason::MissingColumns { columns: missing });
        }

        let base = match document.stem.trim() {
            "" => "document",
            _ => document.stem.as_str(),
        };
        let directory_name = directories.claim(base);

        let directory = match output.create_document_directory(&directory_name) {
            Ok(directory) => directory,
            Err(e) => {
                log::error!("{}: {}", document.file_name, e);
                return report.failed(&e);
            }
        };
        report.output_directory = Some(directory);

        let plan = self.plan_table(&directory_name, &table);
        for warning in &plan.warnings {
            log::warn!("{}: {}", document.file_name, warning);
        }

        for unit in &plan.units {
            match output.write_unit(unit) {
                Ok(path) => {
                    log::debug!("Wrote {}", path.display());
                    report.files.push(unit.relative_path.clone());
                }
                Err(e) => {
                    let message = format!("{}: {}", unit.relative_path.display(), e);
                    log::error!("{}", message);
                    report.errors.push(message);
                }
            }
        }

        report.outcome = DocumentOutcome::Extracted {
            files: report.files.len(),
            skipped_rows: plan.skipped_rows.len(),
        };
        report.warnings.extend(plan.warnings);
        report.skipped_rows = plan.skipped_rows;
        report
    }

    /// Processes documents in order, checking for Ctrl+C between them.
    pub fn extract_all(
        &self,
        documents: &[SourceDocument],
        output: &OutputManager,
        shutdown: &GracefulShutdown,
        progress_callback: Option<&dyn Fn(&ExtractionProgress)>,
    ) -> Result<(Vec<DocumentReport>, ExtractionProgress)> {
        let mut progress = ExtractionProgress::new(documents.len());
        let mut directories = NameRegistry::new();
        let mut reports = Vec::with_capacity(documents.len());

        for document in documents {
            shutdown.check_shutdown()?;

            if let Some(callback) = progress_callback {
                callback(&progress);
            }

            let report = self.extract_document(document, output, &mut directories);

            if let DocumentOutcome::Failed { ref error } = report.outcome {
                progress.add_error(format!("{}: {}", document.file_name, error));
            }
            for error in &report.errors {
                progress.add_error(error.clone());
            }

            progress.update_document(document.file_name.clone(), report.files.len());
            reports.push(report);
        }

        if let Some(callback) = progress_callback {
            callback(&progress);
        }

        Ok((reports, progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<(CellValue, CellValue)>) -> SourceTable {
        SourceTable::from_rows(
            vec!["Item Name".to_string(), "SQL".to_string()],
            rows.into_iter().map(|(n, c)| vec![n, c]).collect(),
        )
    }

    fn extractor() -> SheetToFileExtractor {
        SheetToFileExtractor::new(ExtractConfig::default())
    }

    fn paths(plan: &TablePlan) -> Vec<String> {
        plan.units
            .iter()
            .map(|u| u.relative_path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_duplicate_and_blank_names() {
        let table = table(vec![
            (CellValue::text("GetTotals"), CellValue::text("SELECT 1;")),
            (CellValue::text("GetTotals"), CellValue::text("SELECT 2;")),
            (CellValue::text(""), CellValue::text("SELECT 3;")),
        ]);

        let plan = extractor().plan_table("Sales", &table);

        assert_eq!(
            paths(&plan),
            vec!["Sales/GetTotals.sql", "Sales/GetTotals_2.sql", "Sales/Query_2.sql"]
        );
        assert_eq!(plan.units[1].content, "SELECT 2;");
        assert!(plan.skipped_rows.is_empty());
    }

    #[test]
    fn test_content_written_verbatim() {
        let content = "  SELECT *\r\n  FROM t -- trailing  \n\n";
        let table = table(vec![(CellValue::text("q"), CellValue::text(content))]);

        let plan = extractor().plan_table("Doc", &table);
        assert_eq!(plan.units[0].content, content);
    }

    #[test]
    fn test_blank_and_non_text_content_is_skipped() {
        let table = table(vec![
            (CellValue::text("empty"), CellValue::Empty),
            (CellValue::text("spaces"), CellValue::text("   \n")),
            (CellValue::text("number"), CellValue::Number(42.0)),
            (CellValue::text("flag"), CellValue::Bool(true)),
            (CellValue::text("kept"), CellValue::text("SELECT 5;")),
        ]);

        let plan = extractor().plan_table("Doc", &table);

        assert_eq!(paths(&plan), vec!["Doc/kept.sql"]);
        assert_eq!(plan.units[0].row_index, 4);
        assert_eq!(plan.skipped_rows.len(), 4);
        assert_eq!(plan.warnings.len(), 2);
        assert!(plan.warnings[0].contains("number"));
    }

    #[test]
    fn test_non_text_name_uses_placeholder() {
        let table = table(vec![
            (CellValue::Number(7.0), CellValue::text("SELECT 1;")),
            (CellValue::text("  /// "), CellValue::text("SELECT 2;")),
        ]);

        let plan = extractor().plan_table("Doc", &table);

        assert_eq!(paths(&plan), vec!["Doc/Query_0.sql", "Doc/___.sql"]);
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn test_placeholder_collides_with_literal_name() {
        let table = table(vec![
            (CellValue::text("Query_1"), CellValue::text("SELECT 1;")),
            (CellValue::Empty, CellValue::text("SELECT 2;")),
        ]);

        let plan = extractor().plan_table("Doc", &table);
        assert_eq!(paths(&plan), vec!["Doc/Query_1.sql", "Doc/Query_1_2.sql"]);
    }

    #[test]
    fn test_custom_columns_and_extension() {
        let config = ExtractConfig {
            name_column: "Name".to_string(),
            content_column: "Query".to_string(),
            extension: "txt".to_string(),
            ..ExtractConfig::default()
        };
        let table = SourceTable::from_rows(
            vec!["Query".to_string(), "Name".to_string()],
            vec![vec![CellValue::text("SELECT 1;"), CellValue::text("first")]],
        );

        let plan = SheetToFileExtractor::new(config).plan_table("Doc", &table);
        assert_eq!(paths(&plan), vec!["Doc/first.txt"]);
    }

    #[test]
    fn test_progress_tracking() {
        let mut progress = ExtractionProgress::new(4);
        assert_eq!(progress.percentage(), 0.0);

        progress.update_document("a.xlsx".to_string(), 3);
        assert_eq!(progress.percentage(), 25.0);
        assert_eq!(progress.files_written, 3);

        progress.add_error("broken");
        assert_eq!(progress.errors.len(), 1);
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::MissingColumns {
            columns: vec!["SQL".to_string()],
        };
        assert_eq!(reason.to_string(), "missing column(s): SQL");
    }
}
