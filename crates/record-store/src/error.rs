use thiserror::Error;

use crate::{Collection, RecordId};

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// No record with the given id exists in the collection.
    #[error("Record not found: {collection} with id {id}")]
    NotFound {
        collection: Collection,
        id: RecordId,
    },

    /// An insert supplied an id that is already taken.
    #[error("Duplicate id {id} in {collection}")]
    DuplicateId {
        collection: Collection,
        id: RecordId,
    },

    /// A stored row has no integer `id` field.
    #[error("Row in {0} has no integer id")]
    MissingId(Collection),

    /// The backing medium refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A file system error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, RecordStoreError>;
