//! SecOps workbench application layer
//!
//! Wires the tabular store, view projection, transforms, presets and
//! annotations into one [`WorkbenchSession`] and exposes it to the CLI.

pub mod config;
pub mod report;
pub mod session;

pub use config::{AppConfig, StorageBackend, DEFAULT_STORAGE_FILE};
pub use report::{top_groups, ChartKind, ReportBuilder, ReportChart, OTHER_BUCKET};
pub use session::{
    ExportArtifact, JoinOptions, OperationStatus, SessionError, SessionReader, SharedSession, WorkbenchSession,
};
