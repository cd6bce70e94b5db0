//! File configuration for data loading

use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};

use super::null_handling::NullConfig;

/// File type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Delimited text with a header row
    Csv,
    /// Spreadsheet workbook, first sheet only
    Spreadsheet,
}

impl FileType {
    /// Guess the file type from the extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
                FileType::Spreadsheet
            }
            _ => FileType::Csv,
        }
    }
}

/// Configuration for a single input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Path to the file
    pub path: PathBuf,

    /// File type
    pub file_type: FileType,

    /// Field delimiter for CSV files
    pub delimiter: u8,

    /// Null handling configuration
    pub null_config: NullConfig,
}

impl FileConfig {
    /// Create a configuration, detecting the type from the extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_type = FileType::from_path(&path);
        Self {
            path,
            file_type,
            delimiter: b',',
            null_config: NullConfig::default(),
        }
    }

    /// Override the null handling
    pub fn with_null_config(mut self, null_config: NullConfig) -> Self {
        self.null_config = null_config;
        self
    }

    /// Override the CSV delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Get the file name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}
