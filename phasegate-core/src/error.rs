//! Error types for the workflow engine

use crate::models::workflow::PhaseId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the registry, state store and orchestrator
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Phase {0} does not exist (valid phases are 0-13)")]
    PhaseNotFound(u8),

    #[error("Invalid variant name '{name}': {reason}")]
    InvalidVariantName { name: String, reason: String },

    #[error("Decision targets phase {requested} but variant '{variant}' is at phase {current}")]
    PhaseOutOfOrder {
        variant: String,
        requested: PhaseId,
        current: PhaseId,
    },

    #[error("Variant '{0}' is parked; resume it before recording decisions")]
    VariantParked(String),

    #[error("Variant '{0}' is complete and only accepts Confirm at the final phase")]
    VariantComplete(String),

    #[error("Answer for phase {0} is empty")]
    EmptyAnswer(PhaseId),

    #[error("Variant '{variant}' is already in use by another session ({holder})")]
    VariantLocked { variant: String, holder: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Prompt rendering failed: {0}")]
    Render(String),
}

impl WorkflowError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for WorkflowError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, WorkflowError>;
