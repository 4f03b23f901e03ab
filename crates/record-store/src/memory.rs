use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    Collection, RecordStoreError, Result,
    store::{RecordStore, validate_rows_for_save},
};

#[derive(Debug, Default)]
struct InMemoryState {
    collections: HashMap<Collection, Vec<Value>>,
    fail_next_save: HashSet<Collection>,
}

/// In-memory record store implementation for testing.
///
/// This implementation keeps every collection in memory and provides
/// the same interface as the file and PostgreSQL backends.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next save to `collection` fail with
    /// [`RecordStoreError::Unavailable`]. The flag clears after firing.
    pub async fn fail_next_save(&self, collection: Collection) {
        self.state.write().await.fail_next_save.insert(collection);
    }

    /// Returns the number of rows stored in a collection.
    pub async fn row_count(&self, collection: Collection) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(&collection)
            .map_or(0, Vec::len)
    }

    /// Clears all collections.
    pub async fn clear(&self) {
        self.state.write().await.collections.clear();
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, collection: Collection, rows: Vec<Value>) -> Result<()> {
        validate_rows_for_save(collection, &rows)?;

        let mut state = self.state.write().await;
        if state.fail_next_save.remove(&collection) {
            return Err(RecordStoreError::Unavailable(format!(
                "simulated write failure on {collection}"
            )));
        }
        state.collections.insert(collection, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn load_absent_collection_is_empty() {
        let store = InMemoryRecordStore::new();
        let rows = store.load(Collection::Products).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_whole_collection() {
        let store = InMemoryRecordStore::new();
        store
            .save(
                Collection::Products,
                vec![json!({"id": 1}), json!({"id": 2})],
            )
            .await
            .unwrap();
        store
            .save(Collection::Products, vec![json!({"id": 3})])
            .await
            .unwrap();

        let rows = store.load(Collection::Products).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 3})]);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = InMemoryRecordStore::new();
        store
            .save(Collection::Orders, vec![json!({"id": 1})])
            .await
            .unwrap();

        assert_eq!(store.row_count(Collection::Orders).await, 1);
        assert_eq!(store.row_count(Collection::OrderItems).await, 0);
    }

    #[tokio::test]
    async fn fail_next_save_fires_once() {
        let store = InMemoryRecordStore::new();
        store.fail_next_save(Collection::CartItems).await;

        let first = store
            .save(Collection::CartItems, vec![json!({"id": 1})])
            .await;
        assert!(matches!(first, Err(RecordStoreError::Unavailable(_))));
        assert_eq!(store.row_count(Collection::CartItems).await, 0);

        let second = store
            .save(Collection::CartItems, vec![json!({"id": 1})])
            .await;
        assert!(second.is_ok());
        assert_eq!(store.row_count(Collection::CartItems).await, 1);
    }

    #[tokio::test]
    async fn save_rejects_rows_without_ids() {
        let store = InMemoryRecordStore::new();
        let result = store
            .save(Collection::Categories, vec![json!({"name": "x"})])
            .await;
        assert!(matches!(result, Err(RecordStoreError::MissingId(_))));
    }
}
