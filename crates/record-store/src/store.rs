use async_trait::async_trait;
use serde_json::Value;

use crate::{Collection, RecordId, RecordStoreError, Result, record::row_id};

/// Core trait for record store backends.
///
/// A backend persists whole collections: reads return every row of a
/// collection and writes replace the collection's full contents. There
/// is no partial-row locking; callers that need read-check-write
/// atomicity serialize through [`crate::Records::write_lock`].
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads every row of a collection.
    ///
    /// An absent collection yields an empty vector, not an error.
    async fn load(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Replaces the contents of a collection.
    async fn save(&self, collection: Collection, rows: Vec<Value>) -> Result<()>;
}

/// Extension trait providing convenience methods for record stores.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Returns the number of rows in a collection.
    async fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.load(collection).await?.len())
    }

    /// Returns the highest id in a collection.
    async fn max_id(&self, collection: Collection) -> Result<Option<RecordId>> {
        let rows = self.load(collection).await?;
        Ok(rows.iter().filter_map(row_id).max())
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}

/// Validates rows before a collection is saved.
///
/// Every row must be a JSON object with a unique integer `id`.
pub fn validate_rows_for_save(collection: Collection, rows: &[Value]) -> Result<()> {
    let mut seen = std::collections::HashSet::with_capacity(rows.len());
    for row in rows {
        let id = row_id(row).ok_or(RecordStoreError::MissingId(collection))?;
        if !seen.insert(id) {
            return Err(RecordStoreError::DuplicateId { collection, id });
        }
    }
    Ok(())
}
