//! Core types for the SecOps workbench
//!
//! This crate provides the value model, the dataset container, persistent
//! storage, the annotation side-table and the read-only session contract
//! shared by every other crate.

pub mod annotations;
pub mod dataset;
pub mod events;
pub mod provider;
pub mod settings;
pub mod storage;
pub mod value;

// Re-export commonly used types
pub use annotations::{compose_key, Annotation, AnnotationKeyConfig, AnnotationStore};
pub use dataset::Dataset;
pub use events::EventBus;
pub use provider::{DataSessionProvider, GroupCount, SessionSnapshot, Summary, EMPTY_BUCKET};
pub use settings::{ExportScope, WorkbenchSettings, DEFAULT_NOTE_COLUMN};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use value::{natural_cmp, scalar_cmp, Row, Scalar};
