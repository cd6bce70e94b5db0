//! Read-side views over a workbench dataset: projection, summaries and export

pub mod export;
pub mod projection;
pub mod summary;

// Re-exports
pub use export::{
    escape_html, render, suggested_file_name, to_csv, to_html, to_xlsx, ExportError, ExportFormat, ExportTable,
    DATA_SHEET, SUMMARY_SHEET,
};
pub use projection::filter::{FilterOperator, FilterState, RowFilter, SearchScope};
pub use projection::sort::{sorted_rows, SortDirection, SortState};
pub use projection::{filtered_sorted_rows, preview, Preview, ViewState};
pub use summary::{group_and_count, groupable_fields};
