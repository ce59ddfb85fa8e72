//! Error types for the study engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the syllabus loader, the state store and the session.
///
/// Corrupted state never shows up here: the store recovers from it locally.
/// Discipline failures and duplicate draws are outcomes, not errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error("syllabus not found or unreadable at {path:?}")]
    CatalogMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("syllabus is invalid: {reason}")]
    CatalogInvalid { reason: String },
    #[error("subject '{0}' is not in the syllabus")]
    UnknownSubject(String),
    #[error("failed to write study state to {path:?}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode study state")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StudyError>;
