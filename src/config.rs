use crate::error::{Result, SqlSheetError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SHEET_NAME: &str = "SQL Statements";
pub const DEFAULT_NAME_COLUMN: &str = "Item Name";
pub const DEFAULT_CONTENT_COLUMN: &str = "SQL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub sheet_name: String,
    pub name_column: String,
    pub content_column: String,
    pub extension: String,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_folder: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub debug: bool,
    pub cli_binary: String,
    pub command_timeout: u64,
    pub run_validation: bool,
    pub run_analyzer: bool,
    pub run_transpiler: bool,
    pub format_sql: bool,
    pub upload: bool,
    pub remote_folder: String,
    pub skip_modified_yesterday: bool,
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
            content_column: DEFAULT_CONTENT_COLUMN.to_string(),
            extension: "sql".to_string(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            target_path: None,
            dialect: None,
            profile: None,
            debug: false,
            cli_binary: "databricks".to_string(),
            command_timeout: 600, // 10 minutes
            run_validation: true,
            run_analyzer: true,
            run_transpiler: true,
            format_sql: true,
            upload: true,
            remote_folder: "/Shared".to_string(),
            skip_modified_yesterday: false,
            replacements: Vec::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SqlSheetError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SqlSheetError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| SqlSheetError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["sqlsheet.toml", ".sqlsheet.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref input) = cli_args.input_folder {
            self.output.input_folder = Some(input.clone());
        }

        if let Some(ref output) = cli_args.output_folder {
            self.output.output_folder = Some(output.clone());
        }

        if let Some(ref sheet) = cli_args.sheet_name {
            self.extract.sheet_name = sheet.clone();
        }

        if let Some(ref column) = cli_args.name_column {
            self.extract.name_column = column.clone();
        }

        if let Some(ref column) = cli_args.content_column {
            self.extract.content_column = column.clone();
        }

        if let Some(ref source) = cli_args.source_path {
            self.pipeline.source_path = Some(source.clone());
        }

        if let Some(ref target) = cli_args.target_path {
            self.pipeline.target_path = Some(target.clone());
        }

        if let Some(ref dialect) = cli_args.dialect {
            self.pipeline.dialect = Some(dialect.clone());
        }

        if let Some(ref profile) = cli_args.profile {
            self.pipeline.profile = Some(profile.clone());
        }

        if cli_args.debug {
            self.pipeline.debug = true;
        }

        if cli_args.no_upload {
            self.pipeline.upload = false;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| SqlSheetError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| SqlSheetError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extract.sheet_name.is_empty() {
            return Err(SqlSheetError::Config {
                message: "Marker sheet name must not be empty".to_string(),
            });
        }

        if self.extract.name_column.trim().is_empty()
            || self.extract.content_column.trim().is_empty()
        {
            return Err(SqlSheetError::Config {
                message: "Name and content column headers must not be empty".to_string(),
            });
        }

        if self.extract.name_column.trim() == self.extract.content_column.trim() {
            return Err(SqlSheetError::Config {
                message: "Name and content columns must be different".to_string(),
            });
        }

        if self.extract.extension.is_empty() || self.extract.extension.contains(['/', '\\', '.']) {
            return Err(SqlSheetError::Config {
                message: format!(
                    "Invalid output extension '{}': use a bare extension such as 'sql'",
                    self.extract.extension
                ),
            });
        }

        for pattern in &self.extract.exclude_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(SqlSheetError::Config {
                    message: format!("Invalid exclude pattern '{}': {}", pattern, e),
                });
            }
        }

        if self.pipeline.command_timeout == 0 {
            return Err(SqlSheetError::Config {
                message: "Command timeout must be greater than 0".to_string(),
            });
        }

        if self.pipeline.cli_binary.trim().is_empty() {
            return Err(SqlSheetError::Config {
                message: "pipeline.cli_binary must not be empty".to_string(),
            });
        }

        if !self.pipeline.remote_folder.starts_with('/') {
            return Err(SqlSheetError::Config {
                message: format!(
                    "Remote folder must be an absolute workspace path: {}",
                    self.pipeline.remote_folder
                ),
            });
        }

        Ok(())
    }

    pub fn command_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.pipeline.command_timeout)
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.pipeline.replacements = vec![Replacement {
            from: "edw.".to_string(),
            to: "edw_catalog.".to_string(),
        }];
        toml::to_string_pretty(&sample_config).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub sheet_name: Option<String>,
    pub name_column: Option<String>,
    pub content_column: Option<String>,
    pub source_path: Option<PathBuf>,
    pub target_path: Option<PathBuf>,
    pub dialect: Option<String>,
    pub profile: Option<String>,
    pub debug: bool,
    pub no_upload: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_folder(mut self, input: Option<PathBuf>) -> Self {
        self.input_folder = input;
        self
    }

    pub fn with_output_folder(mut self, output: Option<PathBuf>) -> Self {
        self.output_folder = output;
        self
    }

    pub fn with_sheet_name(mut self, sheet: Option<String>) -> Self {
        self.sheet_name = sheet;
        self
    }

    pub fn with_columns(mut self, name: Option<String>, content: Option<String>) -> Self {
        self.name_column = name;
        self.content_column = content;
        self
    }

    pub fn with_source_path(mut self, source: Option<PathBuf>) -> Self {
        self.source_path = source;
        self
    }

    pub fn with_target_path(mut self, target: Option<PathBuf>) -> Self {
        self.target_path = target;
        self
    }

    pub fn with_dialect(mut self, dialect: Option<String>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_no_upload(mut self, no_upload: bool) -> Self {
        self.no_upload = no_upload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.extract.sheet_name, "SQL Statements");
        assert_eq!(config.extract.name_column, "Item Name");
        assert_eq!(config.extract.content_column, "SQL");
        assert_eq!(config.pipeline.command_timeout, 600);
        assert_eq!(config.pipeline.remote_folder, "/Shared");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.extract.content_column = "Item Name".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extract.exclude_patterns = vec!["(".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.remote_folder = "Shared".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.pipeline.dialect = Some("synapse".to_string());
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.pipeline.dialect.as_deref(), Some("synapse"));
        assert_eq!(loaded_config.extract.sheet_name, config.extract.sheet_name);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            dialect = "oracle"
            run_analyzer = false

            [[pipeline.replacements]]
            from = "isdelete = 0"
            to = "etl_is_active = 1"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.dialect.as_deref(), Some("oracle"));
        assert!(!config.pipeline.run_analyzer);
        assert!(config.pipeline.run_transpiler);
        assert_eq!(config.pipeline.replacements.len(), 1);
        assert_eq!(config.extract.sheet_name, "SQL Statements");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_sheet_name(Some("Queries".to_string()))
            .with_dialect(Some("teradata".to_string()))
            .with_no_upload(true);

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.extract.sheet_name, "Queries");
        assert_eq!(config.pipeline.dialect.as_deref(), Some("teradata"));
        assert!(!config.pipeline.upload);
        assert!(!config.pipeline.debug);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[extract]"));
        assert!(sample.contains("[pipeline]"));
        assert!(sample.contains("replacements"));
    }
}
