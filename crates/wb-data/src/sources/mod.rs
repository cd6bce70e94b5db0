//! File sources
//!
//! Every input format decodes to the same [`RawTable`] shape before
//! ingestion.

pub mod csv_source;
pub mod xlsx_source;

pub use csv_source::CsvSource;
pub use xlsx_source::XlsxSource;

use async_trait::async_trait;
use wb_core::{Dataset, Scalar};

use crate::config::{FileConfig, FileType};
use crate::DataError;

/// Decoded header plus positional records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl RawTable {
    /// Convert into a reconciled dataset
    pub fn into_dataset(self) -> Dataset {
        Dataset::from_records(self.fields, self.rows)
    }
}

/// Anything that can be decoded into a table
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Decode the whole table
    async fn read_table(&self) -> Result<RawTable, DataError>;

    /// Get the source name (usually the file name)
    fn source_name(&self) -> &str;
}

/// Pick a source implementation for a file configuration
pub fn open_source(config: FileConfig) -> Box<dyn TableSource> {
    match config.file_type {
        FileType::Csv => Box::new(CsvSource::new(config)),
        FileType::Spreadsheet => Box::new(XlsxSource::new(config)),
    }
}

/// Clean a header cell: trim and drop a UTF-8 byte order mark
pub(crate) fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// Fail when the header row carries no names at all
pub(crate) fn require_header(fields: &[String]) -> Result<(), DataError> {
    if fields.iter().all(|f| f.is_empty()) {
        return Err(DataError::MissingHeader);
    }
    Ok(())
}
