use thiserror::Error;

use crate::document::{DocumentKey, DocumentKind, ValidationError};
use crate::store::StoreError;

/// Failure of a document resource operation.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} {1} not found")]
    NotFound(DocumentKind, DocumentKey),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} was modified concurrently")]
    Conflict(DocumentKey),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DocumentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConditionFailed(key) => DocumentError::Conflict(key),
            StoreError::Encoding(e) => DocumentError::Serialization(e),
            other => DocumentError::Store(other),
        }
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;
