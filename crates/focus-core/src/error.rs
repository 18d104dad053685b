use std::path::PathBuf;
use thiserror::Error;

use crate::models::ResourceId;

/// All errors produced by the focus coordinator.
#[derive(Error, Debug)]
pub enum FocusError {
    /// The backing store file could not be read.
    #[error("Failed to read store {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing store file could not be written.
    #[error("Failed to write store {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A persisted value did not have the expected shape.
    #[error("Corrupt store value for key {key}: {reason}")]
    CorruptValue { key: String, reason: String },

    /// A host call against a single resource failed.
    #[error("Resource {id} rejected request: {reason}")]
    Resource { id: ResourceId, reason: String },

    /// No resource matched the requested id (or no resource is focused).
    #[error("Resource not found")]
    ResourceNotFound,

    /// An inbound request was well-formed JSON but not a valid command.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request only makes sense while focus mode is engaged.
    #[error("Focus mode is not active")]
    NotActive,

    /// A feature toggle in the coordinator settings disables the request.
    #[error("{0} disabled")]
    Disabled(&'static str),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The coordinator task is no longer running.
    #[error("Coordinator stopped")]
    Stopped,
}

impl FocusError {
    /// Build a per-resource failure.
    pub fn resource(id: ResourceId, reason: impl Into<String>) -> Self {
        Self::Resource {
            id,
            reason: reason.into(),
        }
    }

    /// `true` for failures that concern the durable store.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::StoreRead { .. } | Self::StoreWrite { .. } | Self::CorruptValue { .. }
        )
    }
}

/// Convenience alias used throughout the focus crates.
pub type Result<T> = std::result::Result<T, FocusError>;
