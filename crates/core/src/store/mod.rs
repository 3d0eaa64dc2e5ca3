pub mod memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::{Document, DocumentKey, DocumentKind};

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use query::{KeyCondition, Projection, QueryRequest, SortCondition};

/// Raw stored item: the document's field mapping.
pub type Item = serde_json::Map<String, Value>;

/// Outcome of a keyed read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(item) => Some(item),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(item) => Lookup::Found(item),
            None => Lookup::NotFound,
        }
    }
}

/// Precondition attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutCondition {
    /// Unconditional upsert.
    Always,
    /// Only overwrite an existing item whose `updatedAt` still equals this value.
    UpdatedAtEquals(DateTime<Utc>),
}

/// An item ready to be written, with its key and index columns extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: DocumentKey,
    pub kind: DocumentKind,
    pub path: String,
    pub body: Item,
}

impl Record {
    pub fn from_document<A: Serialize>(document: &Document<A>) -> Result<Self, serde_json::Error> {
        let body = match serde_json::to_value(document)? {
            Value::Object(map) => map,
            _ => {
                return Err(<serde_json::Error as serde::ser::Error>::custom(
                    "document did not serialize to an object",
                ))
            }
        };

        Ok(Self {
            key: document.key(),
            kind: document.kind,
            path: document.path.clone(),
            body,
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store rejected write: {0}")]
    Rejected(String),

    #[error("conditional write failed for {0}")]
    ConditionFailed(DocumentKey),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a failed write: caller-input faults become [`StoreError::Rejected`].
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            use sqlx::error::ErrorKind;

            let caller_fault = matches!(
                db.kind(),
                ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
                    | ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
            ) || db.code().is_some_and(|code| code.starts_with("22"));

            if caller_fault {
                return StoreError::Rejected(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Persistence collaborator consumed by the document resources.
///
/// Offers keyed get/put/delete plus prefix queries on the `(type, path)`
/// secondary index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &DocumentKey) -> Result<Lookup<Item>, StoreError>;

    async fn put(&self, record: Record, condition: PutCondition) -> Result<(), StoreError>;

    /// Remove the item under `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError>;

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Item>, StoreError>;

    /// Connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Page, PageAttributes};

    #[test]
    fn record_extracts_key_and_index_columns() {
        let now = Utc::now();
        let page = Page {
            id: "p".into(),
            version: "v".into(),
            path: "acme/home".into(),
            kind: DocumentKind::Page,
            created_at: now,
            updated_at: now,
            attributes: PageAttributes::default(),
        };

        let record = Record::from_document(&page).unwrap();
        assert_eq!(record.key, DocumentKey::new("p", "v"));
        assert_eq!(record.kind, DocumentKind::Page);
        assert_eq!(record.path, "acme/home");
        assert_eq!(record.body["type"], Value::String("page".into()));
    }

    #[test]
    fn lookup_from_option() {
        assert_eq!(Lookup::from(Some(1)), Lookup::Found(1));
        assert_eq!(Lookup::<i32>::from(None), Lookup::NotFound);
        assert!(!Lookup::<i32>::NotFound.is_found());
    }

    #[test]
    fn non_database_write_errors_are_infrastructure() {
        let err = StoreError::from_write(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
