use crate::config::{CliOverrides, Config};
use crate::error::{Result, SqlSheetError};
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use console::Term;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sqlsheet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract SQL statements from Excel workbooks into .sql files")]
#[command(
    long_about = "sqlsheet reads every .xlsx workbook in a folder, finds the sheet holding SQL \
                  statements and writes each row to its own .sql file, one subfolder per workbook."
)]
#[command(after_help = "EXAMPLES:\n  \
    sqlsheet ./workbooks ./sql_out\n  \
    sqlsheet ./workbooks ./sql_out --sheet Queries --name-column Name --content-column Body\n  \
    sqlsheet ./workbooks ./sql_out --dry-run\n  \
    sqlsheet --config sqlsheet.toml --output-format json")]
pub struct ExtractCli {
    /// Folder containing the .xlsx workbooks
    pub input: Option<PathBuf>,

    /// Folder the extracted .sql files are written to
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Name of the sheet holding the statements
    #[arg(long)]
    pub sheet: Option<String>,

    /// Header of the column holding file names
    #[arg(long)]
    pub name_column: Option<String>,

    /// Header of the column holding SQL text
    #[arg(long)]
    pub content_column: Option<String>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write a run log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// List the workbooks that would be processed without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Parser, Debug)]
#[command(name = "sqlsheet-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Analyze, transpile and publish SQL scripts with Databricks Lakebridge")]
#[command(after_help = "EXAMPLES:\n  \
    sqlsheet-pipeline --source-path ./sql_out --target-path ./migration --dialect teradata\n  \
    sqlsheet-pipeline --config sqlsheet.toml --profile dev --no-upload")]
pub struct PipelineCli {
    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Folder holding the SQL scripts to migrate
    #[arg(long)]
    pub source_path: Option<PathBuf>,

    /// Folder receiving reports, converted code and notebooks
    #[arg(long)]
    pub target_path: Option<PathBuf>,

    /// Source SQL dialect passed to the analyzer and transpiler
    #[arg(long)]
    pub dialect: Option<String>,

    /// Databricks CLI profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Pass --debug to every Lakebridge command
    #[arg(long)]
    pub debug: bool,

    /// Skip the workspace upload step
    #[arg(long)]
    pub no_upload: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl ExtractCli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_input_folder(self.input.as_deref().map(clean_path))
            .with_output_folder(self.output.as_deref().map(clean_path))
            .with_sheet_name(self.sheet.clone())
            .with_columns(self.name_column.clone(), self.content_column.clone())
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

impl PipelineCli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_source_path(self.source_path.as_deref().map(clean_path))
            .with_target_path(self.target_path.as_deref().map(clean_path))
            .with_dialect(self.dialect.clone())
            .with_profile(self.profile.clone())
            .with_debug(self.debug)
            .with_no_upload(self.no_upload)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Drops the quotes a pasted Windows path often carries.
pub fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

fn clean_path(path: &std::path::Path) -> PathBuf {
    PathBuf::from(strip_quotes(&path.to_string_lossy()))
}

const PROMPT_ATTEMPTS: usize = 3;

/// Asks on the terminal until a non-empty answer is given.
/// Gives up after a few empty reads, which also covers EOF (Ctrl+D).
pub fn prompt_value(label: &str) -> Result<String> {
    let term = Term::stdout();
    let attempts = if term.is_term() { PROMPT_ATTEMPTS } else { 1 };

    read_answer(label, attempts, || {
        term.write_str(&format!("{}: ", label))?;
        term.read_line()
    })
}

fn read_answer<F>(label: &str, attempts: usize, mut read: F) -> Result<String>
where
    F: FnMut() -> std::io::Result<String>,
{
    for _ in 0..attempts {
        let line = read()?;
        let value = strip_quotes(&line);
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }

    Err(SqlSheetError::Config {
        message: format!("{} was not provided", label),
    })
}

pub fn prompt_path(label: &str) -> Result<PathBuf> {
    prompt_value(label).map(PathBuf::from)
}
