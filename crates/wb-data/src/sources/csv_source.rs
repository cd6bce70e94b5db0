use std::fs::File;
use std::io::{BufReader, Read};
use async_trait::async_trait;
use csv::ReaderBuilder;
use tracing::debug;

use wb_core::Scalar;

use super::{clean_header, require_header, RawTable, TableSource};
use crate::config::{FileConfig, NullConfig};
use crate::DataError;

/// Where the CSV bytes come from
#[derive(Debug, Clone)]
enum CsvInput {
    File,
    Buffer(Vec<u8>),
}

/// CSV data source.
///
/// The first record is the header row; blank lines are skipped and records
/// shorter or longer than the header are padded or truncated during
/// reconciliation. Cells are always text.
pub struct CsvSource {
    config: FileConfig,
    input: CsvInput,
    source_name: String,
}

impl CsvSource {
    /// Create a CSV source reading from the configured path
    pub fn new(config: FileConfig) -> Self {
        let source_name = config.file_name();
        Self {
            config,
            input: CsvInput::File,
            source_name,
        }
    }

    /// Create a CSV source over an in-memory buffer
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, null_config: NullConfig) -> Self {
        let source_name = name.into();
        let config = FileConfig::new(source_name.clone()).with_null_config(null_config);
        Self {
            config,
            input: CsvInput::Buffer(bytes),
            source_name,
        }
    }

    /// Parse CSV from any reader
    pub fn parse<R: Read>(reader: R, config: &FileConfig) -> Result<RawTable, DataError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(config.delimiter)
            .from_reader(reader);

        let fields: Vec<String> = csv_reader.headers()?.iter().map(clean_header).collect();
        require_header(&fields)?;

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(
                record
                    .iter()
                    .map(|value| to_scalar(value, &config.null_config))
                    .collect(),
            );
        }

        debug!(rows = rows.len(), columns = fields.len(), "Parsed CSV");

        Ok(RawTable { fields, rows })
    }
}

fn to_scalar(value: &str, null_config: &NullConfig) -> Scalar {
    if null_config.is_null(value) {
        Scalar::Empty
    } else {
        Scalar::from_text(value)
    }
}

#[async_trait]
impl TableSource for CsvSource {
    async fn read_table(&self) -> Result<RawTable, DataError> {
        let config = self.config.clone();
        let input = self.input.clone();

        tokio::task::spawn_blocking(move || match input {
            CsvInput::File => {
                let file = File::open(&config.path)?;
                CsvSource::parse(BufReader::new(file), &config)
            }
            CsvInput::Buffer(bytes) => CsvSource::parse(bytes.as_slice(), &config),
        })
        .await?
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}
