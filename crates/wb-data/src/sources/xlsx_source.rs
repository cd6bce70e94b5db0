//! Spreadsheet data source

use std::io::{Cursor, Read, Seek};
use async_trait::async_trait;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use tracing::debug;

use wb_core::Scalar;

use super::{clean_header, require_header, RawTable, TableSource};
use crate::config::{FileConfig, NullConfig};
use crate::DataError;

/// Spreadsheet source: first sheet only, first row is the header
pub struct XlsxSource {
    config: FileConfig,
    bytes: Option<Vec<u8>>,
    source_name: String,
}

impl XlsxSource {
    /// Create a spreadsheet source reading from the configured path
    pub fn new(config: FileConfig) -> Self {
        let source_name = config.file_name();
        Self {
            config,
            bytes: None,
            source_name,
        }
    }

    /// Create a spreadsheet source over an in-memory workbook
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, null_config: NullConfig) -> Self {
        let source_name = name.into();
        let config = FileConfig::new(source_name.clone()).with_null_config(null_config);
        Self {
            config,
            bytes: Some(bytes),
            source_name,
        }
    }

    fn decode(config: &FileConfig, bytes: Option<Vec<u8>>) -> Result<RawTable, DataError> {
        let range = match bytes {
            Some(bytes) => {
                let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
                first_sheet(&mut workbook)?
            }
            None => {
                let mut workbook = open_workbook_auto(&config.path)?;
                first_sheet(&mut workbook)?
            }
        };

        Self::range_to_table(&range, &config.null_config)
    }

    /// Convert a worksheet range into a raw table
    pub fn range_to_table(range: &Range<Data>, null_config: &NullConfig) -> Result<RawTable, DataError> {
        let mut rows_iter = range.rows();

        let fields: Vec<String> = match rows_iter.next() {
            Some(header) => header
                .iter()
                .map(|cell| clean_header(&cell.to_string()))
                .collect(),
            None => Vec::new(),
        };
        require_header(&fields)?;

        let rows: Vec<Vec<Scalar>> = rows_iter
            .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
            .map(|row| row.iter().map(|cell| to_scalar(cell, null_config)).collect())
            .collect();

        debug!(rows = rows.len(), columns = fields.len(), "Decoded spreadsheet");

        Ok(RawTable { fields, rows })
    }
}

fn first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> Result<Range<Data>, DataError> {
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DataError::Spreadsheet("No sheets found in workbook".to_string()))?;

    Ok(workbook.worksheet_range(&sheet_name)?)
}

fn to_scalar(cell: &Data, null_config: &NullConfig) -> Scalar {
    match cell {
        Data::Empty => Scalar::Empty,
        Data::Int(i) => Scalar::from_number(*i as f64),
        Data::Float(f) => Scalar::from_number(*f),
        Data::String(s) if null_config.is_null(s) => Scalar::Empty,
        Data::String(s) => Scalar::from_text(s.clone()),
        other => Scalar::from_text(other.to_string()),
    }
}

#[async_trait]
impl TableSource for XlsxSource {
    async fn read_table(&self) -> Result<RawTable, DataError> {
        let config = self.config.clone();
        let bytes = self.bytes.clone();

        tokio::task::spawn_blocking(move || XlsxSource::decode(&config, bytes)).await?
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(cells: Vec<Vec<Data>>) -> Range<Data> {
        let height = cells.len() as u32;
        let width = cells.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height.saturating_sub(1), width.saturating_sub(1)));
        for (r, row) in cells.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_range_to_table() {
        let r = range(vec![
            vec![Data::String("Email".into()), Data::String("Score".into())],
            vec![Data::String("a@x.com".into()), Data::Float(12.0)],
            vec![Data::Empty, Data::Empty],
            vec![Data::String("b@x.com".into()), Data::Int(3)],
        ]);
        let table = XlsxSource::range_to_table(&r, &NullConfig::default()).unwrap();
        assert_eq!(table.fields, vec!["Email", "Score"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], Scalar::Number(12.0));
        assert_eq!(table.rows[1][1].as_display(), "3");
    }

    #[test]
    fn test_bool_cells_become_text() {
        let r = range(vec![
            vec![Data::String("flag".into())],
            vec![Data::Bool(true)],
        ]);
        let table = XlsxSource::range_to_table(&r, &NullConfig::default()).unwrap();
        assert_eq!(table.rows[0][0], Scalar::from("true"));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let result = XlsxSource::decode(&FileConfig::new("x.xlsx"), Some(b"not a workbook".to_vec()));
        assert!(matches!(result, Err(DataError::Spreadsheet(_))));
    }
}
