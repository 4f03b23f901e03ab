use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Collection, Result, store::RecordStore};

/// The verbatim contents of a set of collections at one instant.
///
/// Restoring a snapshot overwrites each captured collection in full, which
/// is how a failed multi-collection change is undone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// Captured collections with their rows, in capture order.
    pub collections: Vec<(Collection, Vec<Value>)>,
}

impl CollectionSnapshot {
    /// Reads every listed collection from `store`.
    pub async fn capture<S>(store: &S, collections: &[Collection]) -> Result<Self>
    where
        S: RecordStore + ?Sized,
    {
        let mut captured = Vec::with_capacity(collections.len());
        for &collection in collections {
            captured.push((collection, store.load(collection).await?));
        }
        Ok(Self {
            taken_at: Utc::now(),
            collections: captured,
        })
    }

    /// Writes every captured collection back to `store`.
    ///
    /// All collections are attempted; the first error is returned.
    pub async fn restore<S>(&self, store: &S) -> Result<()>
    where
        S: RecordStore + ?Sized,
    {
        let mut first_error = None;
        for (collection, rows) in &self.collections {
            if let Err(e) = store.save(*collection, rows.clone()).await {
                tracing::error!(%collection, error = %e, "failed to restore collection");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the captured collection names.
    pub fn collection_names(&self) -> Vec<Collection> {
        self.collections.iter().map(|(c, _)| *c).collect()
    }

    /// Returns the captured rows of one collection.
    pub fn rows(&self, collection: Collection) -> Option<&[Value]> {
        self.collections
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, rows)| rows.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;
    use serde_json::json;

    #[tokio::test]
    async fn capture_and_restore() {
        let store = InMemoryRecordStore::new();
        store
            .save(Collection::Products, vec![json!({"id": 1, "stock_quantity": 80})])
            .await
            .unwrap();

        let snapshot = CollectionSnapshot::capture(&store, &[Collection::Products, Collection::Orders])
            .await
            .unwrap();
        assert_eq!(
            snapshot.collection_names(),
            vec![Collection::Products, Collection::Orders]
        );
        assert_eq!(snapshot.rows(Collection::Orders), Some(&[][..]));

        store
            .save(Collection::Products, vec![json!({"id": 1, "stock_quantity": 78})])
            .await
            .unwrap();
        store
            .save(Collection::Orders, vec![json!({"id": 1})])
            .await
            .unwrap();

        snapshot.restore(&store).await.unwrap();

        assert_eq!(
            store.load(Collection::Products).await.unwrap(),
            vec![json!({"id": 1, "stock_quantity": 80})]
        );
        assert!(store.load(Collection::Orders).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restore_continues_past_failures() {
        let store = InMemoryRecordStore::new();
        let snapshot = CollectionSnapshot::capture(&store, &[Collection::Orders, Collection::CartItems])
            .await
            .unwrap();

        store
            .save(Collection::CartItems, vec![json!({"id": 9})])
            .await
            .unwrap();
        store.fail_next_save(Collection::Orders).await;

        let result = snapshot.restore(&store).await;
        assert!(result.is_err());
        assert_eq!(store.row_count(Collection::CartItems).await, 0);
    }

    #[test]
    fn snapshot_serializes() {
        let snapshot = CollectionSnapshot {
            taken_at: Utc::now(),
            collections: vec![(Collection::Categories, vec![json!({"id": 1})])],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["collections"][0][0], json!("categories"));
    }
}
