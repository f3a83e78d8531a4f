//! Error types for opsync-core

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::EntityKind;
use crate::remote::TransportError;

/// Result type alias using opsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in opsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The remote API could not be reached or answered with a failure status
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A cross-entity reference points at a record the local store does not have
    #[error("Referenced {kind} not found: {reference}")]
    ReferenceNotFound {
        kind: EntityKind,
        reference: String,
    },

    /// The local store rejected a write
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required key was absent from an inbound record
    #[error("Missing field: '{0}'")]
    MissingField(String),

    /// Record not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Validation(message.unwrap_or_else(|| failure.to_string()))
            }
            other => Self::Database(other),
        }
    }
}
