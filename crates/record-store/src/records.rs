use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Collection, CollectionSnapshot, LogQuery, OperationKind, OperationLog, OperationLogEntry,
    Record, RecordId, RecordStoreError, Result,
    oplog::MULTIPLE_COLLECTIONS,
    record::row_id,
    store::{RecordStore, RecordStoreExt},
};

/// Guard returned by [`Records::write_lock`].
pub type WriteGuard = OwnedMutexGuard<()>;

/// Collections included in the SQL export, in dependency order.
const EXPORTED: [Collection; 5] = [
    Collection::Categories,
    Collection::Products,
    Collection::Orders,
    Collection::OrderItems,
    Collection::CartItems,
];

/// Record counts and the most recent logged operation.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub collections: BTreeMap<String, usize>,
    pub total_records: usize,
    pub last_operation: Option<OperationLogEntry>,
}

/// Typed CRUD facade over a [`RecordStore`] backend.
///
/// Every mutating call rewrites the whole collection and appends one
/// operation log entry before returning. Log failures are reported and
/// swallowed; they never fail or undo the mutation.
///
/// The facade itself does not serialize callers. Services that read,
/// check and then write must hold [`Records::write_lock`] for the whole
/// sequence. The lock is not reentrant.
pub struct Records<S> {
    store: Arc<S>,
    log: OperationLog,
    lock: Arc<Mutex<()>>,
    origin: Arc<str>,
}

impl<S> Clone for Records<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            log: self.log.clone(),
            lock: Arc::clone(&self.lock),
            origin: Arc::clone(&self.origin),
        }
    }
}

impl<S> std::fmt::Debug for Records<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("log", &self.log)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl<S: RecordStore> Records<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            log: OperationLog::new(),
            lock: Arc::new(Mutex::new(())),
            origin: Arc::from("unknown"),
        }
    }

    /// Replaces the operation log configuration.
    pub fn with_log(mut self, log: OperationLog) -> Self {
        self.log = log;
        self
    }

    /// Returns a handle that records `origin` in its log entries.
    ///
    /// The handle shares the backend and the write lock.
    pub fn with_origin(&self, origin: impl AsRef<str>) -> Self {
        let mut scoped = self.clone();
        scoped.origin = Arc::from(origin.as_ref());
        scoped
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Acquires the store-wide write lock.
    pub async fn write_lock(&self) -> WriteGuard {
        Arc::clone(&self.lock).lock_owned().await
    }

    /// Returns every record of `R`'s collection.
    pub async fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let rows = self.store.load(R::COLLECTION).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(RecordStoreError::from))
            .collect()
    }

    /// Returns the record with `id`, if present.
    pub async fn find<R: Record>(&self, id: RecordId) -> Result<Option<R>> {
        let rows = self.store.load(R::COLLECTION).await?;
        rows.into_iter()
            .find(|row| row_id(row) == Some(id))
            .map(|row| serde_json::from_value(row).map_err(RecordStoreError::from))
            .transpose()
    }

    /// Returns the record with `id`.
    pub async fn get_by_id<R: Record>(&self, id: RecordId) -> Result<R> {
        self.find(id).await?.ok_or(RecordStoreError::NotFound {
            collection: R::COLLECTION,
            id,
        })
    }

    /// Inserts a record, assigning the next id when it has none.
    pub async fn insert<R: Record>(&self, record: R) -> Result<R> {
        match self.try_insert(record.clone()).await {
            Ok(inserted) => {
                self.log_write(OperationKind::Insert, R::COLLECTION, inserted.id(), &inserted)
                    .await;
                Ok(inserted)
            }
            Err(e) => {
                let payload = json!({ "error": e.to_string(), "data": record });
                self.log_write(OperationKind::InsertError, R::COLLECTION, record.id(), &payload)
                    .await;
                Err(e)
            }
        }
    }

    async fn try_insert<R: Record>(&self, mut record: R) -> Result<R> {
        let mut rows = self.store.load(R::COLLECTION).await?;
        let max_id = rows.iter().filter_map(row_id).max();

        let id = match record.id() {
            Some(id) if rows.iter().any(|row| row_id(row) == Some(id)) => {
                return Err(RecordStoreError::DuplicateId {
                    collection: R::COLLECTION,
                    id,
                });
            }
            Some(id) => id,
            None => max_id.map_or_else(RecordId::first, |id| id.next()),
        };
        record.set_id(id);

        let now = Utc::now();
        record.stamp_created(now);
        record.stamp_updated(now);

        rows.push(serde_json::to_value(&record)?);
        self.store.save(R::COLLECTION, rows).await?;
        Ok(record)
    }

    /// Shallow-merges `patch` into the stored record with `id`.
    ///
    /// Fields the patch serializes replace the stored ones; everything
    /// else is retained. The id cannot be changed.
    pub async fn update<R: Record>(&self, id: RecordId, patch: &R::Patch) -> Result<R> {
        match self.try_update::<R>(id, patch).await {
            Ok((old, new)) => {
                let payload = json!({ "old": old, "new": new });
                self.log_write(OperationKind::Update, R::COLLECTION, Some(id), &payload)
                    .await;
                Ok(new)
            }
            Err(e) => {
                let payload = json!({ "error": e.to_string(), "data": patch });
                self.log_write(OperationKind::UpdateError, R::COLLECTION, Some(id), &payload)
                    .await;
                Err(e)
            }
        }
    }

    async fn try_update<R: Record>(&self, id: RecordId, patch: &R::Patch) -> Result<(R, R)> {
        let mut rows = self.store.load(R::COLLECTION).await?;
        let position = rows
            .iter()
            .position(|row| row_id(row) == Some(id))
            .ok_or(RecordStoreError::NotFound {
                collection: R::COLLECTION,
                id,
            })?;

        let old: R = serde_json::from_value(rows[position].clone())?;
        let mut merged = rows[position].clone();
        if let (Value::Object(target), Value::Object(fields)) =
            (&mut merged, serde_json::to_value(patch)?)
        {
            merge_fields(target, fields);
        }

        let mut new: R = serde_json::from_value(merged)?;
        new.set_id(id);
        new.stamp_updated(Utc::now());

        rows[position] = serde_json::to_value(&new)?;
        self.store.save(R::COLLECTION, rows).await?;
        Ok((old, new))
    }

    /// Removes the record with `id` and returns it.
    pub async fn delete<R: Record>(&self, id: RecordId) -> Result<R> {
        match self.try_delete::<R>(id).await {
            Ok(removed) => {
                self.log_write(OperationKind::Delete, R::COLLECTION, Some(id), &removed)
                    .await;
                Ok(removed)
            }
            Err(e) => {
                let payload = json!({ "error": e.to_string() });
                self.log_write(OperationKind::DeleteError, R::COLLECTION, Some(id), &payload)
                    .await;
                Err(e)
            }
        }
    }

    async fn try_delete<R: Record>(&self, id: RecordId) -> Result<R> {
        let mut rows = self.store.load(R::COLLECTION).await?;
        let position = rows
            .iter()
            .position(|row| row_id(row) == Some(id))
            .ok_or(RecordStoreError::NotFound {
                collection: R::COLLECTION,
                id,
            })?;

        let removed = rows.remove(position);
        let record = serde_json::from_value(removed)?;
        self.store.save(R::COLLECTION, rows).await?;
        Ok(record)
    }

    /// Removes every record matching `predicate` with a single rewrite.
    ///
    /// One log entry is appended per removed record. Returns the removed
    /// records; an empty result performs no write.
    pub async fn delete_where<R, F>(&self, predicate: F) -> Result<Vec<R>>
    where
        R: Record,
        F: Fn(&R) -> bool + Send,
    {
        let rows = self.store.load(R::COLLECTION).await?;
        let mut kept = Vec::with_capacity(rows.len());
        let mut removed = Vec::new();
        for row in rows {
            let record: R = serde_json::from_value(row.clone())?;
            if predicate(&record) {
                removed.push(record);
            } else {
                kept.push(row);
            }
        }

        if removed.is_empty() {
            return Ok(removed);
        }

        if let Err(e) = self.store.save(R::COLLECTION, kept).await {
            let payload = json!({ "error": e.to_string(), "count": removed.len() });
            self.log_write(OperationKind::DeleteError, R::COLLECTION, None, &payload)
                .await;
            return Err(e);
        }

        for record in &removed {
            self.log_write(OperationKind::Delete, R::COLLECTION, record.id(), record)
                .await;
        }
        Ok(removed)
    }

    /// Captures the listed collections verbatim.
    pub async fn snapshot(&self, collections: &[Collection]) -> Result<CollectionSnapshot> {
        CollectionSnapshot::capture(self.store.as_ref(), collections).await
    }

    /// Overwrites every collection in `snapshot` with its captured rows.
    pub async fn restore(&self, snapshot: &CollectionSnapshot) -> Result<()> {
        tracing::debug!(collections = ?snapshot.collection_names(), "restoring snapshot");
        snapshot.restore(self.store.as_ref()).await
    }

    /// Appends a transaction-level entry (`TRANSACTION_COMMIT`,
    /// `TRANSACTION_ROLLBACK`). Best-effort.
    pub async fn log_transaction(&self, kind: OperationKind, payload: Value) {
        let entry = OperationLogEntry::builder(kind, MULTIPLE_COLLECTIONS)
            .payload_raw(payload)
            .origin(self.origin.as_ref())
            .build();
        self.append_log(entry).await;
    }

    /// Records store start-up in the operation log. Best-effort.
    pub async fn log_init(&self, backend: &str) {
        let names: Vec<&str> = Collection::ALL.iter().map(Collection::as_str).collect();
        let entry = OperationLogEntry::builder(OperationKind::DatabaseInit, MULTIPLE_COLLECTIONS)
            .payload_raw(json!({ "backend": backend, "collections": names }))
            .origin(self.origin.as_ref())
            .build();
        self.append_log(entry).await;
    }

    async fn log_write<T: Serialize>(
        &self,
        kind: OperationKind,
        collection: Collection,
        id: Option<RecordId>,
        payload: &T,
    ) {
        metrics::counter!(
            "record_store_writes_total",
            "collection" => collection.as_str(),
            "operation" => kind.as_str()
        )
        .increment(1);

        let mut builder = OperationLogEntry::builder(kind, collection.as_str())
            .origin(self.origin.as_ref());
        if let Some(id) = id {
            builder = builder.record_id(id);
        }
        let entry = match builder.payload(payload) {
            Ok(builder) => builder.build(),
            Err(e) => {
                tracing::warn!(%collection, %kind, error = %e, "failed to serialize log payload");
                return;
            }
        };
        self.append_log(entry).await;
    }

    async fn append_log(&self, entry: OperationLogEntry) {
        let kind = entry.operation;
        if let Err(e) = self.log.append(self.store.as_ref(), entry).await {
            tracing::warn!(%kind, error = %e, "failed to append operation log entry");
        }
    }

    /// Returns the most recent `limit` log entries, newest first.
    pub async fn recent_logs(&self, limit: usize) -> Result<Vec<OperationLogEntry>> {
        self.logs(&LogQuery::new().limit(limit)).await
    }

    /// Returns log entries matching `query`, newest first.
    pub async fn logs(&self, query: &LogQuery) -> Result<Vec<OperationLogEntry>> {
        self.log.entries(self.store.as_ref(), query).await
    }

    /// Returns per-collection record counts and the last logged operation.
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut collections = BTreeMap::new();
        let mut total_records = 0;
        for collection in Collection::ALL {
            let count = self.store.count(collection).await?;
            total_records += count;
            collections.insert(collection.as_str().to_string(), count);
        }
        let last_operation = self.recent_logs(1).await?.into_iter().next();

        Ok(StoreStats {
            collections,
            total_records,
            last_operation,
        })
    }

    /// Renders the catalog, order and cart collections as SQL `INSERT`
    /// statements.
    pub async fn export_sql(&self) -> Result<String> {
        let mut sql = format!(
            "-- Storefront data export\n-- Generated: {}\n\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );

        for collection in EXPORTED {
            let rows = self.store.load(collection).await?;
            sql.push_str(&format!("-- {collection} ({} rows)\n", rows.len()));
            for row in rows {
                let Value::Object(fields) = row else {
                    continue;
                };
                let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
                let values: Vec<String> = fields.values().map(sql_literal).collect();
                sql.push_str(&format!(
                    "INSERT INTO {collection} ({}) VALUES ({});\n",
                    columns.join(", "),
                    values.join(", ")
                ));
            }
            sql.push('\n');
        }

        Ok(sql)
    }
}

fn merge_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        if key == "id" {
            continue;
        }
        target.insert(key, value);
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}
