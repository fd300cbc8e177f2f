use crate::config::PipelineConfig;
use crate::error::{Result, SqlSheetError};
use crate::pipeline::command::{CommandOutcome, CommandRunner, ExternalCommand};
use crate::pipeline::lakebridge::Lakebridge;
use crate::pipeline::postprocess::{apply_replacements, format_sql, render_notebook};
use crate::pipeline::summary::{Stage, StageStatus, SummaryLedger};
use crate::scanner::FileFilter;
use crate::ui::GracefulShutdown;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use walkdir::WalkDir;

/// Date folder and file timestamp shared by every artifact of one run.
#[derive(Debug, Clone)]
pub struct RunStamp {
    pub today: NaiveDate,
    pub date_folder: String,
    pub timestamp: String,
}

impl RunStamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(moment: NaiveDateTime) -> Self {
        Self {
            today: moment.date(),
            date_folder: moment.format("%Y%m%d").to_string(),
            timestamp: moment.format("%Y%m%d_%H%M%S").to_string(),
        }
    }
}

/// Output layout under the target folder.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub target: PathBuf,
    pub analyzer_output: PathBuf,
    pub converted: PathBuf,
    pub final_formatted: PathBuf,
    pub notebooks: PathBuf,
    pub metadata: PathBuf,
}

impl PipelinePaths {
    pub fn new(target: &Path, stamp: &RunStamp) -> Self {
        Self {
            target: target.to_path_buf(),
            analyzer_output: target.join("analyzer_output"),
            converted: target.join("Converted_Code"),
            final_formatted: target.join("Final_Formatted"),
            notebooks: target.join("Databricks_Notebooks"),
            metadata: target.join("metadata").join(&stamp.date_folder),
        }
    }

    pub fn log_file(&self, stamp: &RunStamp) -> PathBuf {
        self.metadata
            .join(format!("pipeline_run_{}.log", stamp.timestamp))
    }

    pub fn summary_file(&self, stamp: &RunStamp) -> PathBuf {
        self.metadata
            .join(format!("sql_summary_{}.csv", stamp.timestamp))
    }

    fn create_all(&self) -> Result<()> {
        for dir in [
            &self.analyzer_output,
            &self.converted,
            &self.final_formatted,
            &self.notebooks,
            &self.metadata,
        ] {
            fs::create_dir_all(dir).map_err(|e| SqlSheetError::Permission {
                path: format!("Cannot create {}: {}", dir.display(), e),
            })?;
        }
        Ok(())
    }
}

/// A `.sql` file in the source folder, optionally inside a one-level group folder.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlScript {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
    pub group: Option<String>,
}

impl SqlScript {
    fn new(path: PathBuf, group: Option<String>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            file_name,
            stem,
            group,
        }
    }

    /// Name used in the summary: `group/file.sql` or `file.sql`.
    pub fn key(&self) -> String {
        match &self.group {
            Some(group) => format!("{}/{}", group, self.file_name),
            None => self.file_name.clone(),
        }
    }

    pub fn in_group(&self, base: &Path) -> PathBuf {
        match &self.group {
            Some(group) => base.join(group),
            None => base.to_path_buf(),
        }
    }

    fn report_label(&self) -> String {
        match &self.group {
            Some(group) => format!("{}_{}", group, self.stem),
            None => self.stem.clone(),
        }
    }
}

fn sql_files_in(dir: &Path, filter: &FileFilter) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && filter.accepts(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

fn modified_on(modified: SystemTime, day: NaiveDate) -> bool {
    DateTime::<Local>::from(modified).date_naive() == day
}

/// Root `.sql` files first, then each immediate subfolder as a group.
pub fn discover_scripts(
    source: &Path,
    skip_modified_yesterday: bool,
    today: NaiveDate,
) -> Result<Vec<SqlScript>> {
    if !source.is_dir() {
        return Err(SqlSheetError::InputNotFound {
            path: source.display().to_string(),
        });
    }

    let filter = FileFilter::for_sql_scripts();
    let yesterday = today - ChronoDuration::days(1);

    let mut scripts: Vec<SqlScript> = sql_files_in(source, &filter)
        .into_iter()
        .map(|path| SqlScript::new(path, None))
        .collect();

    let groups = WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir());

    for group in groups {
        let name = group.file_name().to_string_lossy().into_owned();

        if skip_modified_yesterday {
            let modified = group.metadata().ok().and_then(|m| m.modified().ok());
            if modified.is_some_and(|m| modified_on(m, yesterday)) {
                log::info!("Skipping {} (modified yesterday)", group.path().display());
                continue;
            }
        }

        let files = sql_files_in(group.path(), &filter);
        if files.is_empty() {
            log::debug!("Skipping {}: no SQL files", group.path().display());
            continue;
        }

        scripts.extend(
            files
                .into_iter()
                .map(|path| SqlScript::new(path, Some(name.clone()))),
        );
    }

    Ok(scripts)
}

#[derive(Debug, Clone)]
pub struct PipelineProgress {
    pub stage: &'static str,
    pub current: Option<String>,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub scripts: usize,
    pub notebooks_written: usize,
    pub uploads_failed: usize,
    pub summary_file: PathBuf,
    pub ledger: SummaryLedger,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub elapsed_seconds: f64,
}

pub struct Pipeline<'a, R: CommandRunner> {
    config: PipelineConfig,
    source: PathBuf,
    target: PathBuf,
    dialect: String,
    lakebridge: Lakebridge,
    runner: &'a R,
    shutdown: &'a GracefulShutdown,
    stamp: RunStamp,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
    /// Fails unless source, target and dialect are all set.
    pub fn new(
        config: &PipelineConfig,
        runner: &'a R,
        shutdown: &'a GracefulShutdown,
        stamp: RunStamp,
    ) -> Result<Self> {
        let missing = |field: &str| SqlSheetError::Config {
            message: format!("pipeline.{} is required", field),
        };

        let source = config.source_path.clone().ok_or_else(|| missing("source_path"))?;
        let target = config.target_path.clone().ok_or_else(|| missing("target_path"))?;
        let dialect = config
            .dialect
            .clone()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| missing("dialect"))?;

        Ok(Self {
            config: config.clone(),
            source,
            target,
            dialect,
            lakebridge: Lakebridge::from_config(config),
            runner,
            shutdown,
            stamp,
        })
    }

    pub fn paths(&self) -> PipelinePaths {
        PipelinePaths::new(&self.target, &self.stamp)
    }

    pub fn check_tool(&self) -> Result<PathBuf> {
        self.runner
            .locate(self.lakebridge.cli())
            .ok_or_else(|| SqlSheetError::ToolNotFound {
                program: self.lakebridge.cli().to_string(),
            })
    }

    /// Returns warnings; a missing source folder is an error.
    pub fn validate_source(&self) -> Result<Vec<String>> {
        if !self.source.exists() {
            return Err(SqlSheetError::InputNotFound {
                path: self.source.display().to_string(),
            });
        }

        let mut warnings = Vec::new();
        if discover_scripts(&self.source, false, self.stamp.today)?.is_empty() {
            warnings.push(format!("No .sql files found in {}", self.source.display()));
        }
        Ok(warnings)
    }

    pub fn run(
        &self,
        progress_callback: Option<&dyn Fn(&PipelineProgress)>,
    ) -> Result<PipelineReport> {
        let started = Instant::now();
        let paths = self.paths();

        let tool = self.check_tool()?;
        log::info!("Using {}", tool.display());

        let mut warnings = Vec::new();
        if self.config.run_validation {
            warnings = self.validate_source()?;
            for warning in &warnings {
                log::warn!("{}", warning);
            }
        }

        paths.create_all()?;

        let scripts = discover_scripts(
            &self.source,
            self.config.skip_modified_yesterday,
            self.stamp.today,
        )?;
        log::info!("Found {} SQL script(s) in {}", scripts.len(), self.source.display());

        let mut ledger = SummaryLedger::new();
        for script in &scripts {
            ledger.register(script.key());
        }

        let mut errors = Vec::new();
        let report = |stage: &'static str, current: Option<&SqlScript>, completed: usize| {
            if let Some(callback) = progress_callback {
                callback(&PipelineProgress {
                    stage,
                    current: current.map(SqlScript::key),
                    completed,
                    total: scripts.len(),
                });
            }
        };

        if self.config.run_analyzer {
            for (index, script) in scripts.iter().enumerate() {
                self.shutdown.check_shutdown()?;
                report("Analyze", Some(script), index);

                let status = self.analyze(script, &paths, &mut errors);
                ledger.record(&script.key(), Stage::Analyzer, status);
            }
            report("Analyze", None, scripts.len());
        }

        if self.config.run_transpiler {
            for (index, script) in scripts.iter().enumerate() {
                self.shutdown.check_shutdown()?;
                report("Transpile", Some(script), index);

                let status = self.transpile(script, &paths, &mut errors);
                ledger.record(&script.key(), Stage::Transpile, status);
            }
            report("Transpile", None, scripts.len());
        }

        let mut notebooks_written = 0;
        let mut uploads_failed = 0;
        for (index, script) in scripts.iter().enumerate() {
            self.shutdown.check_shutdown()?;
            report("Post-process", Some(script), index);

            let status = match self.post_process(script, &paths) {
                Ok(Some(notebook)) => {
                    notebooks_written += 1;
                    if self.config.upload && !self.upload(&notebook, &mut errors) {
                        uploads_failed += 1;
                    }
                    StageStatus::Success
                }
                Ok(None) => StageStatus::Skipped,
                Err(e) => {
                    let message = format!("Post-process {}: {}", script.key(), e);
                    log::error!("{}", message);
                    errors.push(message);
                    StageStatus::Failed
                }
            };
            ledger.record(&script.key(), Stage::PostProcess, status);
        }

        // Transpiler outputs with no matching source script still get notebooks.
        for extra in self.unmatched_outputs(&scripts, &paths)? {
            self.shutdown.check_shutdown()?;
            log::info!("Post-processing extra output {}", extra.key());

            match self.post_process(&extra, &paths) {
                Ok(Some(notebook)) => {
                    notebooks_written += 1;
                    if self.config.upload && !self.upload(&notebook, &mut errors) {
                        uploads_failed += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    let message = format!("Post-process {}: {}", extra.key(), e);
                    log::error!("{}", message);
                    errors.push(message);
                }
            }
        }
        report("Post-process", None, scripts.len());

        let summary_file = paths.summary_file(&self.stamp);
        ledger.save(&summary_file)?;
        log::info!("Summary CSV saved at {}", summary_file.display());

        Ok(PipelineReport {
            source_path: self.source.clone(),
            target_path: self.target.clone(),
            scripts: scripts.len(),
            notebooks_written,
            uploads_failed,
            summary_file,
            ledger,
            warnings,
            errors,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }

    fn execute(&self, command: &ExternalCommand, script: &SqlScript, errors: &mut Vec<String>) -> bool {
        match self.runner.run(command) {
            Ok(outcome) if outcome.success() => {
                log::info!("{} {}: {}", command.title, script.key(), outcome.describe());
                true
            }
            Ok(outcome) => {
                let message = format!("{} {} {}", command.title, script.key(), outcome.describe());
                log_failure(&message, &outcome);
                errors.push(message);
                false
            }
            Err(e) => {
                let message = format!("{} {}: {}", command.title, script.key(), e);
                log::error!("{}", message);
                errors.push(message);
                false
            }
        }
    }

    fn analyze(&self, script: &SqlScript, paths: &PipelinePaths, errors: &mut Vec<String>) -> StageStatus {
        let staging = match tempfile::Builder::new()
            .prefix(".analyze_")
            .tempdir_in(&paths.target)
        {
            Ok(dir) => dir,
            Err(e) => {
                let message = format!("Analyze {}: cannot create staging folder: {}", script.key(), e);
                log::error!("{}", message);
                errors.push(message);
                return StageStatus::Failed;
            }
        };

        if let Err(e) = fs::copy(&script.path, staging.path().join(&script.file_name)) {
            let message = format!("Analyze {}: cannot stage file: {}", script.key(), e);
            log::error!("{}", message);
            errors.push(message);
            return StageStatus::Failed;
        }

        let report_file = paths.analyzer_output.join(format!(
            "lakebridge_analysis_{}_{}.xlsx",
            script.report_label(),
            self.stamp.timestamp
        ));
        let command = self
            .lakebridge
            .analyze(staging.path(), &report_file, &self.dialect);

        StageStatus::from_success(self.execute(&command, script, errors))
    }

    fn transpile(&self, script: &SqlScript, paths: &PipelinePaths, errors: &mut Vec<String>) -> StageStatus {
        let output_folder = script.in_group(&paths.converted);
        if let Err(e) = fs::create_dir_all(&output_folder) {
            let message = format!("Transpile {}: {}", script.key(), e);
            log::error!("{}", message);
            errors.push(message);
            return StageStatus::Failed;
        }

        let command = self
            .lakebridge
            .transpile(&script.path, &self.dialect, &output_folder);

        StageStatus::from_success(self.execute(&command, script, errors))
    }

    /// Formats the converted script and renders its notebook.
    /// `Ok(None)` means there was nothing to process and the transpiler was off.
    fn post_process(&self, script: &SqlScript, paths: &PipelinePaths) -> Result<Option<PathBuf>> {
        let converted = script.in_group(&paths.converted).join(&script.file_name);

        if !converted.is_file() {
            if self.config.run_transpiler {
                return Err(SqlSheetError::InvalidPath {
                    path: format!("no converted output at {}", converted.display()),
                });
            }
            return Ok(None);
        }

        let bytes = fs::read(&converted)?;
        let mut sql = apply_replacements(&String::from_utf8_lossy(&bytes), &self.config.replacements);
        if self.config.format_sql {
            sql = format_sql(&sql);
        }

        let final_dir = script.in_group(&paths.final_formatted);
        fs::create_dir_all(&final_dir)?;
        fs::write(final_dir.join(&script.file_name), &sql)?;

        let notebook_dir = script.in_group(&paths.notebooks);
        fs::create_dir_all(&notebook_dir)?;
        let notebook = notebook_dir.join(format!("{}.py", script.stem));
        fs::write(&notebook, render_notebook(&script.file_name, &sql))?;

        Ok(Some(notebook))
    }

    /// `.sql` files under `Converted_Code` whose key matches no source script.
    fn unmatched_outputs(&self, scripts: &[SqlScript], paths: &PipelinePaths) -> Result<Vec<SqlScript>> {
        if !paths.converted.is_dir() {
            return Ok(Vec::new());
        }

        let known: HashSet<String> = scripts.iter().map(SqlScript::key).collect();
        Ok(discover_scripts(&paths.converted, false, self.stamp.today)?
            .into_iter()
            .filter(|output| !known.contains(&output.key()))
            .collect())
    }

    fn upload(&self, notebook: &Path, errors: &mut Vec<String>) -> bool {
        let command = self
            .lakebridge
            .import_notebook(notebook, &self.config.remote_folder);

        match self.runner.run(&command) {
            Ok(outcome) if outcome.success() => {
                log::info!("Uploaded {}", notebook.display());
                true
            }
            Ok(outcome) => {
                let message = format!("Upload {} {}", notebook.display(), outcome.describe());
                log_failure(&message, &outcome);
                errors.push(message);
                false
            }
            Err(e) => {
                let message = format!("Upload {}: {}", notebook.display(), e);
                log::error!("{}", message);
                errors.push(message);
                false
            }
        }
    }
}

fn log_failure(message: &str, outcome: &CommandOutcome) {
    log::error!("{}", message);
    let stderr = outcome.stderr.trim();
    if !stderr.is_empty() {
        log::error!("stderr: {}", stderr);
    }
}
