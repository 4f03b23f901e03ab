use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Collection, Result,
    store::{RecordStore, validate_rows_for_save},
};

/// JSON-file-backed record store.
///
/// Each collection lives in `<data_dir>/<collection>.json` as a
/// pretty-printed array of rows. Saves rewrite the whole file; the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct JsonFileRecordStore {
    data_dir: PathBuf,
}

impl JsonFileRecordStore {
    /// Opens a store rooted at `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        tracing::debug!(data_dir = %data_dir.display(), "opened JSON record store");
        Ok(Self { data_dir })
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the file backing a collection.
    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.as_str()))
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let path = self.collection_path(collection);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, collection: Collection, rows: Vec<Value>) -> Result<()> {
        validate_rows_for_save(collection, &rows)?;

        let contents = serde_json::to_string_pretty(&rows)?;
        tokio::fs::write(self.collection_path(collection), contents).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn open_creates_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");

        let store = JsonFileRecordStore::open(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.data_dir(), dir.as_path());
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileRecordStore::open(tmp.path()).await.unwrap();

        let rows = store.load(Collection::Orders).await.unwrap();
        assert!(rows.is_empty());
        assert!(!store.collection_path(Collection::Orders).exists());
    }

    #[tokio::test]
    async fn save_writes_named_collection_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileRecordStore::open(tmp.path()).await.unwrap();

        store
            .save(
                Collection::OrderItems,
                vec![json!({"id": 1, "quantity": 2})],
            )
            .await
            .unwrap();

        let path = tmp.path().join("order_items.json");
        assert!(path.is_file());
        let on_disk: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(on_disk, vec![json!({"id": 1, "quantity": 2})]);
    }

    #[tokio::test]
    async fn contents_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = JsonFileRecordStore::open(tmp.path()).await.unwrap();
            store
                .save(Collection::Products, vec![json!({"id": 5, "name": "BCAA"})])
                .await
                .unwrap();
        }

        let reopened = JsonFileRecordStore::open(tmp.path()).await.unwrap();
        let rows = reopened.load(Collection::Products).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 5, "name": "BCAA"})]);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("products.json"), "{not json").unwrap();
        let store = JsonFileRecordStore::open(tmp.path()).await.unwrap();

        let result = store.load(Collection::Products).await;
        assert!(matches!(
            result,
            Err(crate::RecordStoreError::Serialization(_))
        ));
    }
}
