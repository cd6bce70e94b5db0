//! Per-file parsing options

mod file_config;
mod null_handling;

pub use file_config::{FileConfig, FileType};
pub use null_handling::{NullConfig, COMMON_PLACEHOLDERS};
