//! Data loading and the tabular store for the workbench

pub mod config;
pub mod loader;
pub mod sources;
pub mod store;

use tokio::task::JoinError;
use thiserror::Error;

// Re-exports
pub use config::{FileConfig, FileType, NullConfig, COMMON_PLACEHOLDERS};
pub use loader::DatasetLoader;
pub use sources::{open_source, CsvSource, RawTable, TableSource, XlsxSource};
pub use store::{CellUpdate, IngestReport, TabularStore, UndoSlot};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("The file has no header row")]
    MissingHeader,

    #[error("Another file is still loading")]
    LoadInProgress,

    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<calamine::Error> for DataError {
    fn from(error: calamine::Error) -> Self {
        match error {
            calamine::Error::Io(io_err) => DataError::Io(io_err),
            other => DataError::Spreadsheet(other.to_string()),
        }
    }
}
