use crate::error::{Result, SqlSheetError};
use crate::extractor::sheet_extractor::{
    DocumentOutcome, DocumentReport, ExtractionProgress, OutputUnit,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub summary: ExtractionSummary,
    pub documents: Vec<DocumentReport>,
    pub finished_at: DateTime<Utc>,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub documents_seen: usize,
    pub documents_extracted: usize,
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub files_written: usize,
    pub rows_skipped: usize,
    pub elapsed_seconds: f64,
}

impl ExtractionSummary {
    pub fn from_reports(reports: &[DocumentReport], progress: &ExtractionProgress) -> Self {
        let mut summary = Self {
            documents_seen: reports.len(),
            elapsed_seconds: progress.elapsed().as_secs_f64(),
            ..Self::default()
        };

        for report in reports {
            match &report.outcome {
                DocumentOutcome::Extracted {
                    files,
                    skipped_rows,
                } => {
                    summary.documents_extracted += 1;
                    summary.files_written += files;
                    summary.rows_skipped += skipped_rows;
                }
                DocumentOutcome::Skipped { .. } => summary.documents_skipped += 1,
                DocumentOutcome::Failed { .. } => summary.documents_failed += 1,
            }
        }

        summary
    }
}

impl ExtractionReport {
    pub fn new(
        input_folder: &Path,
        output_folder: &Path,
        documents: Vec<DocumentReport>,
        progress: &ExtractionProgress,
    ) -> Self {
        Self {
            input_folder: input_folder.to_path_buf(),
            output_folder: output_folder.to_path_buf(),
            summary: ExtractionSummary::from_reports(&documents, progress),
            documents,
            finished_at: Utc::now(),
            errors: progress.errors.clone(),
            dry_run: false,
        }
    }

    /// Report for a run that only listed the documents.
    pub fn dry_run(input_folder: &Path, output_folder: &Path, documents_seen: usize) -> Self {
        Self {
            input_folder: input_folder.to_path_buf(),
            output_folder: output_folder.to_path_buf(),
            summary: ExtractionSummary {
                documents_seen,
                ..ExtractionSummary::default()
            },
            documents: Vec::new(),
            finished_at: Utc::now(),
            errors: Vec::new(),
            dry_run: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Owns the output root and the per-document folders beneath it.
pub struct OutputManager {
    output_root: PathBuf,
}

impl OutputManager {
    pub fn new(output_root: PathBuf) -> Result<Self> {
        let manager = Self { output_root };
        manager.validate_paths()?;
        Ok(manager)
    }

    pub fn get_output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn create_document_directory(&self, name: &str) -> Result<PathBuf> {
        let directory = self.resolve(Path::new(name))?;
        fs::create_dir_all(&directory)?;
        Ok(directory)
    }

    /// Writes the unit, replacing any file already at that path.
    pub fn write_unit(&self, unit: &OutputUnit) -> Result<PathBuf> {
        let destination = self.resolve(&unit.relative_path)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&destination, unit.content.as_bytes())?;
        Ok(destination)
    }

    fn resolve(&self, relative: &Path) -> Result<PathBuf> {
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if escapes || relative.as_os_str().is_empty() {
            return Err(SqlSheetError::InvalidPath {
                path: format!("Refusing to write outside the output folder: {}", relative.display()),
            });
        }

        Ok(self.output_root.join(relative))
    }

    fn validate_paths(&self) -> Result<()> {
        if !self.output_root.exists() {
            fs::create_dir_all(&self.output_root).map_err(|e| SqlSheetError::Permission {
                path: format!(
                    "Cannot create output directory {}: {}",
                    self.output_root.display(),
                    e
                ),
            })?;
        }

        if !self.output_root.is_dir() {
            return Err(SqlSheetError::InvalidPath {
                path: format!("{} is not a directory", self.output_root.display()),
            });
        }

        let probe = self.output_root.join(".sqlsheet_write_test");
        match fs::File::create(&probe) {
            Ok(_) => {
                let _ = fs::remove_file(&probe);
            }
            Err(e) => {
                return Err(SqlSheetError::Permission {
                    path: format!(
                        "No write permission for directory {}: {}",
                        self.output_root.display(),
                        e
                    ),
                });
            }
        }

        Ok(())
    }
}
