//! Preset system for column layouts and value normalization
//!
//! A preset bundles the columns to keep, their display names, value mappings,
//! derivation rules and row filters. Built-in presets live in code; user
//! presets are persisted and can be shared as JSON documents. Presets can be
//! suggested automatically from the field list of a loaded dataset.

pub mod builtin;
pub mod matcher;
pub mod model;
pub mod registry;

use thiserror::Error;

pub use builtin::{builtin_presets, PHISHER_LIKE_ID};
pub use matcher::{match_score, KeepFieldsMatcher, PresetMatcher, SUGGESTION_THRESHOLD};
pub use model::{DerivationRule, Derived, Preset, PresetId, ValueMapping};
pub use registry::PresetRegistry;

/// Errors raised by preset management
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Invalid preset: {0}")]
    Invalid(String),

    #[error("Preset id '{0}' is reserved by a built-in preset")]
    BuiltinConflict(String),

    #[error("Built-in preset '{0}' cannot be modified")]
    ReadOnly(String),

    #[error("Preset '{0}' not found")]
    NotFound(String),

    #[error("Preset document error: {0}")]
    Json(#[from] serde_json::Error),
}
