use crate::config::ExtractConfig;
use crate::error::{Result, SqlSheetError};
use crate::scanner::file_filter::FileFilter;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// One spreadsheet file found in the input folder.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl SourceDocument {
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        Self {
            path,
            file_name,
            stem,
            size,
            modified,
        }
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

pub struct DocumentScanner {
    filter: FileFilter,
}

impl DocumentScanner {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            filter: FileFilter::for_workbooks(config),
        }
    }

    /// Lists the workbooks directly inside `root`, sorted by file name.
    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<SourceDocument>> {
        let root_path = root.as_ref();

        if !root_path.exists() {
            return Err(SqlSheetError::InputNotFound {
                path: root_path.display().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(SqlSheetError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let mut documents = Vec::new();

        let walker = WalkDir::new(root_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Scan error in {}: {}", root_path.display(), err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.filter.accepts(path) {
                log::debug!("Ignoring {}", path.display());
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => {
                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    documents.push(SourceDocument::new(
                        path.to_path_buf(),
                        metadata.len(),
                        modified,
                    ));
                }
                Err(err) => {
                    log::warn!("Cannot read metadata for {}: {}", path.display(), err);
                }
            }
        }

        Ok(documents)
    }
}
