use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::{
    Collection, LogQuery, RecordId, Result,
    record::row_id,
    store::RecordStore,
};

/// Number of entries retained in the `operation_logs` collection.
pub const LOG_CAPACITY: usize = 1000;

/// Collection label used by transaction-level entries.
pub const MULTIPLE_COLLECTIONS: &str = "MULTIPLE";

/// The kind of operation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    InsertError,
    UpdateError,
    DeleteError,
    TransactionCommit,
    TransactionRollback,
    DatabaseInit,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
            OperationKind::InsertError => "INSERT_ERROR",
            OperationKind::UpdateError => "UPDATE_ERROR",
            OperationKind::DeleteError => "DELETE_ERROR",
            OperationKind::TransactionCommit => "TRANSACTION_COMMIT",
            OperationKind::TransactionRollback => "TRANSACTION_ROLLBACK",
            OperationKind::DatabaseInit => "DATABASE_INIT",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    /// Assigned when the entry is appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    pub timestamp: DateTime<Utc>,

    pub operation: OperationKind,

    /// Collection name, or `MULTIPLE` for transaction entries.
    pub collection: String,

    #[serde(default)]
    pub record_id: Option<RecordId>,

    /// Snapshot of the affected data.
    pub payload: Value,

    /// Client address the operation was performed for.
    pub origin: String,
}

impl OperationLogEntry {
    /// Starts building an entry for an operation on a collection.
    pub fn builder(
        operation: OperationKind,
        collection: impl Into<String>,
    ) -> OperationLogEntryBuilder {
        OperationLogEntryBuilder {
            operation,
            collection: collection.into(),
            record_id: None,
            timestamp: None,
            payload: Value::Null,
            origin: None,
        }
    }

    /// Renders the line written to the daily log file.
    pub fn to_log_line(&self) -> String {
        let id = self
            .record_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} [{}] {} {} {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.collection,
            id,
            self.payload
        )
    }
}

/// Builder for [`OperationLogEntry`].
#[derive(Debug)]
pub struct OperationLogEntryBuilder {
    operation: OperationKind,
    collection: String,
    record_id: Option<RecordId>,
    timestamp: Option<DateTime<Utc>>,
    payload: Value,
    origin: Option<String>,
}

impl OperationLogEntryBuilder {
    pub fn record_id(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }

    /// Sets the timestamp. If not set, the current time is used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> serde_json::Result<Self> {
        self.payload = serde_json::to_value(payload)?;
        Ok(self)
    }

    pub fn payload_raw(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Sets the origin address. Defaults to `unknown`.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn build(self) -> OperationLogEntry {
        OperationLogEntry {
            id: None,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            operation: self.operation,
            collection: self.collection,
            record_id: self.record_id,
            payload: self.payload,
            origin: self.origin.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Append-only, uncapped mirror of the operation log: one file per day.
#[derive(Debug, Clone)]
pub struct DailyFileSink {
    dir: PathBuf,
}

impl DailyFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file holding entries for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("database_{}.log", date.format("%Y-%m-%d")))
    }

    /// Appends one line for `entry` to the file of its day.
    pub async fn append(&self, entry: &OperationLogEntry) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(entry.timestamp.date_naive()))
            .await?;
        file.write_all(entry.to_log_line().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// The operation log: a capped `operation_logs` collection plus an
/// optional daily file mirror.
#[derive(Debug, Clone)]
pub struct OperationLog {
    capacity: usize,
    file_sink: Option<DailyFileSink>,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationLog {
    pub fn new() -> Self {
        Self {
            capacity: LOG_CAPACITY,
            file_sink: None,
        }
    }

    /// Overrides the number of retained entries.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Mirrors every appended entry to a daily file.
    pub fn with_file_sink(mut self, sink: DailyFileSink) -> Self {
        self.file_sink = Some(sink);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn file_sink(&self) -> Option<&DailyFileSink> {
        self.file_sink.as_ref()
    }

    /// Appends an entry, trimming the oldest ones beyond capacity.
    ///
    /// The file mirror is written even when the collection write fails, so
    /// the daily file stays complete; the collection error is returned
    /// afterwards. A failing file mirror is reported but does not fail the
    /// append.
    pub async fn append<S>(&self, store: &S, mut entry: OperationLogEntry) -> Result<OperationLogEntry>
    where
        S: RecordStore + ?Sized,
    {
        let stored = self.store_entry(store, &mut entry).await;

        if let Some(sink) = &self.file_sink
            && let Err(e) = sink.append(&entry).await
        {
            tracing::warn!(error = %e, dir = %sink.dir().display(), "failed to mirror operation log entry");
        }

        stored.map(|()| entry)
    }

    async fn store_entry<S>(&self, store: &S, entry: &mut OperationLogEntry) -> Result<()>
    where
        S: RecordStore + ?Sized,
    {
        let mut rows = store.load(Collection::OperationLogs).await?;
        let next_id = rows
            .iter()
            .filter_map(row_id)
            .max()
            .map_or_else(RecordId::first, |id| id.next());
        entry.id = Some(next_id);

        rows.push(serde_json::to_value(&*entry)?);
        if rows.len() > self.capacity {
            let excess = rows.len() - self.capacity;
            rows.drain(..excess);
        }
        store.save(Collection::OperationLogs, rows).await
    }

    /// Returns entries matching `query`, newest first.
    pub async fn entries<S>(&self, store: &S, query: &LogQuery) -> Result<Vec<OperationLogEntry>>
    where
        S: RecordStore + ?Sized,
    {
        let rows = store.load(Collection::OperationLogs).await?;
        let mut entries = rows
            .into_iter()
            .map(serde_json::from_value::<OperationLogEntry>)
            .collect::<serde_json::Result<Vec<_>>>()?;
        entries.reverse();

        Ok(entries
            .into_iter()
            .filter(|entry| query.matches(entry))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry(kind: OperationKind, collection: &str) -> OperationLogEntry {
        OperationLogEntry::builder(kind, collection).build()
    }

    #[test]
    fn kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&OperationKind::TransactionRollback).unwrap();
        assert_eq!(json, "\"TRANSACTION_ROLLBACK\"");
        assert_eq!(OperationKind::InsertError.to_string(), "INSERT_ERROR");
    }

    #[test]
    fn builder_defaults() {
        let entry = OperationLogEntry::builder(OperationKind::Insert, "products")
            .record_id(RecordId::new(4))
            .payload_raw(json!({"name": "Casein"}))
            .build();

        assert_eq!(entry.id, None);
        assert_eq!(entry.origin, "unknown");
        assert_eq!(entry.collection, "products");
        assert_eq!(entry.record_id, Some(RecordId::new(4)));
        assert_eq!(entry.payload, json!({"name": "Casein"}));
    }

    #[test]
    fn log_line_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let entry = OperationLogEntry::builder(OperationKind::Update, "orders")
            .record_id(RecordId::new(12))
            .timestamp(ts)
            .payload_raw(json!({"status": "shipped"}))
            .build();

        assert_eq!(
            entry.to_log_line(),
            "2024-03-09 14:05:00 [UPDATE] orders 12 {\"status\":\"shipped\"}\n"
        );

        let commit = OperationLogEntry::builder(OperationKind::TransactionCommit, MULTIPLE_COLLECTIONS)
            .timestamp(ts)
            .build();
        assert_eq!(
            commit.to_log_line(),
            "2024-03-09 14:05:00 [TRANSACTION_COMMIT] MULTIPLE - null\n"
        );
    }

    #[tokio::test]
    async fn append_assigns_sequential_ids() {
        let store = InMemoryRecordStore::new();
        let log = OperationLog::new();

        let first = log.append(&store, entry(OperationKind::Insert, "products")).await.unwrap();
        let second = log.append(&store, entry(OperationKind::Delete, "products")).await.unwrap();

        assert_eq!(first.id, Some(RecordId::new(1)));
        assert_eq!(second.id, Some(RecordId::new(2)));
    }

    #[tokio::test]
    async fn append_trims_to_capacity() {
        let store = InMemoryRecordStore::new();
        let log = OperationLog::new().with_capacity(5);

        for _ in 0..8 {
            log.append(&store, entry(OperationKind::Insert, "cart_items"))
                .await
                .unwrap();
        }

        let entries = log.entries(&store, &LogQuery::new()).await.unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].id, Some(RecordId::new(8)));
        assert_eq!(entries[4].id, Some(RecordId::new(4)));
    }

    #[tokio::test]
    async fn default_capacity_is_one_thousand() {
        let store = InMemoryRecordStore::new();
        let log = OperationLog::new();
        assert_eq!(log.capacity(), LOG_CAPACITY);

        for _ in 0..LOG_CAPACITY + 3 {
            log.append(&store, entry(OperationKind::Update, "products"))
                .await
                .unwrap();
        }

        assert_eq!(store.row_count(Collection::OperationLogs).await, LOG_CAPACITY);
    }

    #[tokio::test]
    async fn entries_are_filtered_and_limited() {
        let store = InMemoryRecordStore::new();
        let log = OperationLog::new();
        log.append(&store, entry(OperationKind::Insert, "orders")).await.unwrap();
        log.append(&store, entry(OperationKind::Insert, "products")).await.unwrap();
        log.append(&store, entry(OperationKind::Delete, "orders")).await.unwrap();

        let orders = log
            .entries(&store, &LogQuery::for_collection(Collection::Orders))
            .await
            .unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].operation, OperationKind::Delete);

        let limited = log.entries(&store, &LogQuery::new().limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, Some(RecordId::new(3)));
    }

    #[tokio::test]
    async fn file_sink_appends_daily_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DailyFileSink::new(tmp.path().join("logs"));
        let store = InMemoryRecordStore::new();
        let log = OperationLog::new().with_file_sink(sink.clone());

        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        for kind in [OperationKind::Insert, OperationKind::Delete] {
            let e = OperationLogEntry::builder(kind, "categories")
                .record_id(RecordId::new(1))
                .timestamp(ts)
                .build();
            log.append(&store, e).await.unwrap();
        }

        let path = sink.path_for(ts.date_naive());
        assert!(path.ends_with("database_2024-01-02.log"));
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INSERT] categories 1"));
        assert!(lines[1].contains("[DELETE] categories 1"));
    }

    #[tokio::test]
    async fn file_sink_keeps_entry_when_collection_write_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DailyFileSink::new(tmp.path());
        let store = InMemoryRecordStore::new();
        let log = OperationLog::new().with_file_sink(sink.clone());

        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap();
        let e = OperationLogEntry::builder(OperationKind::Update, "products")
            .record_id(RecordId::new(3))
            .timestamp(ts)
            .build();

        store.fail_next_save(Collection::OperationLogs).await;
        let result = log.append(&store, e).await;

        assert!(result.is_err());
        assert_eq!(store.row_count(Collection::OperationLogs).await, 0);
        let contents = std::fs::read_to_string(sink.path_for(ts.date_naive())).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("[UPDATE] products 3"));
    }
}
