use thiserror::Error;

use crate::domain::{RecordId, ReferenceKind, ValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown {kind} id: {id}")]
    UnknownReference { kind: ReferenceKind, id: i64 },

    #[error("Base not found: {0}")]
    BaseNotFound(String),

    #[error("Asset type not found: {0}")]
    AssetTypeNotFound(String),

    #[error("Base already exists: {0}")]
    BaseAlreadyExists(String),

    #[error("Asset type already exists: {0}")]
    AssetTypeAlreadyExists(String),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Database(_))
    }
}
