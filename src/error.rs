use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlSheetError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("Input folder not found: {path}")]
    InputNotFound { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Required tool not found on PATH: {program}")]
    ToolNotFound { program: String },

    #[error("Failed to launch {program}: {message}")]
    CommandLaunch { program: String, message: String },

    #[error("Failed to write summary: {0}")]
    Summary(#[from] csv::Error),

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for SqlSheetError {
    fn user_message(&self) -> String {
        match self {
            SqlSheetError::Workbook { path, message } => {
                format!("Could not read workbook {}: {}", path, message)
            }
            SqlSheetError::InputNotFound { path } => {
                format!("Input folder not found: {}", path)
            }
            SqlSheetError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            SqlSheetError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            SqlSheetError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            SqlSheetError::ToolNotFound { program } => {
                format!("'{}' was not found on PATH", program)
            }
            SqlSheetError::CommandLaunch { program, message } => {
                format!("Could not start {}: {}", program, message)
            }
            SqlSheetError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            SqlSheetError::Workbook { .. } => Some(
                "Make sure the file is a valid .xlsx workbook and is not open in another program.".to_string()
            ),
            SqlSheetError::InputNotFound { .. } => Some(
                "Check the input folder path. Quotes around pasted paths are stripped automatically.".to_string()
            ),
            SqlSheetError::Config { .. } => Some(
                "Check your configuration file syntax or run with --generate-config to see every available field.".to_string()
            ),
            SqlSheetError::Permission { .. } => Some(
                "Ensure you have the necessary read/write permissions for the target directory.".to_string()
            ),
            SqlSheetError::ToolNotFound { .. } => Some(
                "Install and configure the Databricks CLI, or point pipeline.cli_binary at it in the config file.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for SqlSheetError {
    fn from(error: toml::de::Error) -> Self {
        SqlSheetError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SqlSheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = SqlSheetError::InputNotFound {
            path: "/missing".to_string(),
        };
        assert!(error.user_message().contains("Input folder not found"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_tool_not_found_message() {
        let error = SqlSheetError::ToolNotFound {
            program: "databricks".to_string(),
        };
        assert!(error.user_message().contains("databricks"));
        assert!(error.suggestion().unwrap().contains("cli_binary"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let error = SqlSheetError::from(toml_error);
        assert!(matches!(error, SqlSheetError::Config { .. }));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: SqlSheetError = io_error.into();
        assert!(error.to_string().contains("gone"));
        assert!(error.suggestion().is_none());
    }
}
