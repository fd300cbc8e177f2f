pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod pipeline;
pub mod scanner;
pub mod ui;
pub mod workbook;

// Public API re-exports
pub use cli::{ExtractCli, OutputFormat, PipelineCli};
pub use config::{CliOverrides, Config, ExtractConfig, OutputConfig, PipelineConfig};
pub use error::{Result, SqlSheetError, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    DocumentOutcome, DocumentReport, ExtractionProgress, ExtractionReport, NameRegistry,
    OutputManager, SheetToFileExtractor,
};
pub use pipeline::{CommandRunner, Pipeline, PipelineReport, SystemRunner};
pub use scanner::{DocumentScanner, FileFilter, SourceDocument};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};
pub use workbook::{CellValue, SourceTable, WorkbookReader};

use std::path::{Path, PathBuf};

/// Library entry point for the workbook extractor.
pub struct SqlSheet {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl SqlSheet {
    /// Installs the Ctrl+C handler; only one instance per process can do so.
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(
            config,
            output_mode,
            verbose,
            quiet,
            shutdown,
        ))
    }

    pub fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    pub fn input_folder(&self) -> Result<&Path> {
        self.config
            .output
            .input_folder
            .as_deref()
            .ok_or_else(|| SqlSheetError::Config {
                message: "No input folder given".to_string(),
            })
    }

    pub fn output_folder(&self) -> Result<&Path> {
        self.config
            .output
            .output_folder
            .as_deref()
            .ok_or_else(|| SqlSheetError::Config {
                message: "No output folder given".to_string(),
            })
    }

    pub fn scan_documents(&self) -> Result<Vec<SourceDocument>> {
        let input = self.input_folder()?;
        self.output_formatter
            .start_operation(&format!("Scanning {} for workbooks", input.display()));

        let spinner = self.progress_manager.create_spinner("Scanning");
        let scanner = DocumentScanner::new(&self.config.extract);
        let documents = scanner.scan_directory(input);
        spinner.finish_and_clear();

        let documents = documents?;
        self.output_formatter
            .info(&format!("Found {} workbook(s)", documents.len()));
        Ok(documents)
    }

    /// Runs extraction over every workbook in the input folder.
    pub fn extract(&self) -> Result<ExtractionReport> {
        self.shutdown.check_shutdown()?;

        let input = self.input_folder()?;
        let output_root = self.output_folder()?;
        let documents = self.scan_documents()?;
        self.shutdown.check_shutdown()?;

        let output = OutputManager::new(output_root.to_path_buf())?;
        self.output_formatter.debug(&format!(
            "Writing into {}",
            output.get_output_root().display()
        ));

        self.output_formatter.start_operation("Extracting SQL statements");
        let document_progress = self
            .progress_manager
            .create_document_progress(documents.len() as u64);
        let progress_callback = {
            let pb = document_progress.clone();
            move |progress: &ExtractionProgress| {
                ui::progress::update_document_progress(&pb, progress);
            }
        };

        let extractor = SheetToFileExtractor::new(self.config.extract.clone());
        let (reports, progress) =
            extractor.extract_all(&documents, &output, &self.shutdown, Some(&progress_callback))?;

        ui::progress::finish_progress_with_summary(
            &document_progress,
            &format!("Wrote {} file(s)", progress.files_written),
            progress.elapsed(),
        );
        self.progress_manager.clear();

        self.print_notices(&reports);

        Ok(ExtractionReport::new(input, output_root, reports, &progress))
    }

    /// Lists the workbooks `extract` would read; nothing is written.
    pub fn dry_run(&self) -> Result<ExtractionReport> {
        let input = self.input_folder()?;
        let output_root = self.output_folder()?;

        self.output_formatter
            .info("DRY RUN MODE - No files will be written");
        let documents = self.scan_documents()?;
        self.output_formatter.print_document_list(&documents);

        Ok(ExtractionReport::dry_run(input, output_root, documents.len()))
    }

    fn print_notices(&self, reports: &[DocumentReport]) {
        for report in reports {
            for warning in &report.warnings {
                self.output_formatter
                    .warning(&format!("{}: {}", report.document, warning));
            }
            match report.outcome {
                DocumentOutcome::Skipped { ref reason } => self
                    .output_formatter
                    .info(&format!("Skipped {}: {}", report.document, reason)),
                DocumentOutcome::Failed { ref error } => self
                    .output_formatter
                    .error(&format!("Failed {}: {}", report.document, error)),
                DocumentOutcome::Extracted { .. } => {}
            }
        }
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        std::fs::write(output_path.as_ref(), Config::create_sample_config())?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &SqlSheetError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Default location for `--generate-config` when no `--config` is given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("sqlsheet.toml")
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet_instance(config: Config) -> SqlSheet {
        SqlSheet::with_shutdown(
            config,
            OutputMode::Plain,
            0,
            true,
            GracefulShutdown::new_for_test(),
        )
    }

    #[test]
    fn test_missing_folders_are_config_errors() {
        let sqlsheet = quiet_instance(Config::default());
        assert!(matches!(
            sqlsheet.input_folder(),
            Err(SqlSheetError::Config { .. })
        ));
        assert!(matches!(
            sqlsheet.extract(),
            Err(SqlSheetError::Config { .. })
        ));
    }

    #[test]
    fn test_extract_empty_folder() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        std::fs::create_dir(&input).unwrap();

        let mut config = Config::default();
        config.output.input_folder = Some(input);
        config.output.output_folder = Some(temp_dir.path().join("out"));

        let report = quiet_instance(config).extract().unwrap();
        assert_eq!(report.summary.documents_seen, 0);
        assert_eq!(report.summary.files_written, 0);
        assert!(temp_dir.path().join("out").is_dir());
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.input_folder = Some(temp_dir.path().to_path_buf());
        config.output.output_folder = Some(temp_dir.path().join("out"));

        let sqlsheet = quiet_instance(config);
        sqlsheet.request_shutdown();
        assert!(!sqlsheet.is_running());
        assert!(matches!(sqlsheet.extract(), Err(SqlSheetError::Cancelled)));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Sales.xlsx"), b"not really a workbook").unwrap();

        let mut config = Config::default();
        config.output.input_folder = Some(temp_dir.path().to_path_buf());
        config.output.output_folder = Some(temp_dir.path().join("out"));

        let report = quiet_instance(config).dry_run().unwrap();
        assert!(report.dry_run);
        assert_eq!(report.summary.documents_seen, 1);
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        SqlSheet::generate_sample_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[extract]"));
        assert!(content.contains("[pipeline]"));
    }
}
