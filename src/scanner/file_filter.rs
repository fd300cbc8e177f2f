use crate::config::ExtractConfig;
use regex::Regex;
use std::path::Path;

/// Prefix Excel uses for owner/lock files next to an open workbook.
const LOCK_FILE_PREFIX: &str = "~$";

pub struct FileFilter {
    extensions: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S], exclude_patterns: &[String]) -> Self {
        let exclude_patterns = exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
        }
    }

    /// Filter for source workbooks handed to the extractor.
    pub fn for_workbooks(config: &ExtractConfig) -> Self {
        Self::new(&["xlsx"], &config.exclude_patterns)
    }

    /// Filter for SQL scripts picked up by the pipeline.
    pub fn for_sql_scripts() -> Self {
        Self::new(&["sql"], &[])
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name,
            None => return false,
        };

        if filename.starts_with(LOCK_FILE_PREFIX) {
            return false;
        }

        if !self.has_accepted_extension(path) {
            return false;
        }

        !self.matches_any_pattern(filename)
    }

    pub fn has_accepted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }

    pub fn get_extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::for_workbooks(&ExtractConfig::default())
    }
}
