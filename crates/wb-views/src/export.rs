//! Export of the projected view or a summary to CSV, XLSX and HTML

use std::fmt;
use std::str::FromStr;

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use thiserror::Error;
use tracing::debug;

use wb_core::{Dataset, ExportScope, Scalar, Summary};

use crate::projection::filter::FilterState;
use crate::projection::sort::SortState;
use crate::projection::{filtered_sorted_rows, ViewState};

/// Sheet name used for the main export
pub const DATA_SHEET: &str = "Data";
/// Sheet name used for summary exports
pub const SUMMARY_SHEET: &str = "Summary";
/// File stem used when the source has no usable name
pub const DEFAULT_FILE_STEM: &str = "secops-workbench";

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Html => "text/html;charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Headers plus cells, ready to be written in any format
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl ExportTable {
    /// Project the dataset through the view. Headers are display names.
    ///
    /// With [`ExportScope::FullDataset`] every row is written in dataset
    /// order; [`ExportScope::FilteredView`] writes the filtered rows in sort
    /// order.
    pub fn from_view(
        dataset: &Dataset,
        view: &ViewState,
        sort: &SortState,
        filter: &FilterState,
        scope: ExportScope,
    ) -> Self {
        let fields = view.effective_fields(dataset);
        let indices: Vec<usize> = match scope {
            ExportScope::FullDataset => (0..dataset.row_count()).collect(),
            ExportScope::FilteredView => filtered_sorted_rows(dataset, view, sort, filter).collect(),
        };

        let rows = indices
            .into_iter()
            .map(|row| fields.iter().map(|f| dataset.value(row, f).clone()).collect())
            .collect();

        Self {
            headers: view.headers(dataset),
            rows,
        }
    }

    /// Two columns: the field label and `Count`
    pub fn from_summary(summary: &Summary, label: &str) -> Self {
        Self {
            headers: vec![label.to_string(), "Count".to_string()],
            rows: summary
                .rows
                .iter()
                .map(|g| vec![Scalar::from_text(g.value.as_str()), Scalar::from(g.count as i64)])
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Delimited text with a header row
pub fn to_csv(table: &ExportTable) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Scalar::as_display))?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Single-sheet workbook. Numbers stay numeric, empty cells are left blank.
pub fn to_xlsx(table: &ExportTable, sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            match value {
                Scalar::Empty => {}
                Scalar::Number(n) => {
                    worksheet.write_number(r, col as u16, *n)?;
                }
                Scalar::Text(s) => {
                    worksheet.write_string(r, col as u16, s)?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    debug!(rows = table.rows.len(), bytes = buffer.len(), "Wrote XLSX");
    Ok(buffer)
}

/// Self-contained, print-friendly HTML table
pub fn to_html(table: &ExportTable, title: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    html.push_str(TABLE_CSS);
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(title)));
    html.push_str(&format!("<p class=\"meta\">{} rows</p>\n", table.rows.len()));
    html.push_str("<table>\n<thead><tr>");
    for header in &table.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        html.push_str("<tr>");
        for value in row {
            let class = if matches!(value, Scalar::Number(_)) { " class=\"num\"" } else { "" };
            html.push_str(&format!("<td{}>{}</td>", class, escape_html(&value.as_display())));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

/// Encode in the requested format
pub fn render(table: &ExportTable, format: ExportFormat, sheet_name: &str, title: &str) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => Ok(to_csv(table)?.into_bytes()),
        ExportFormat::Xlsx => to_xlsx(table, sheet_name),
        ExportFormat::Html => Ok(to_html(table, title).into_bytes()),
    }
}

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// File name derived from the source, e.g. `fails-summary.xlsx`
pub fn suggested_file_name(source_name: &str, suffix: &str, format: ExportFormat) -> String {
    let stem = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    let stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let stem = stem.trim_matches('-');
    let stem = if stem.is_empty() { DEFAULT_FILE_STEM } else { stem };

    if suffix.is_empty() {
        format!("{}.{}", stem, format.extension())
    } else {
        format!("{}-{}.{}", stem, suffix, format.extension())
    }
}

const TABLE_CSS: &str = "<style>
body { font-family: system-ui, sans-serif; margin: 1.5rem; color: #111827; }
h1 { font-size: 1.25rem; margin-bottom: 0.25rem; }
.meta { color: #6b7280; font-size: 0.8rem; }
table { border-collapse: collapse; width: 100%; font-size: 0.8rem; }
th, td { border: 1px solid #d1d5db; padding: 0.25rem 0.5rem; text-align: left; }
th { background: #f3f4f6; }
td.num { text-align: right; }
@media print { body { margin: 0; } th { background: none; } }
</style>
";
