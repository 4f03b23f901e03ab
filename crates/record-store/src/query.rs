use chrono::{DateTime, Utc};

use crate::{Collection, OperationKind, OperationLogEntry};

/// Builder for operation log queries.
///
/// Results are always returned newest first.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Filter by collection name.
    pub collection: Option<String>,

    /// Filter by operation kinds (any of these).
    pub operations: Option<Vec<OperationKind>>,

    /// Filter by entries at or after this timestamp.
    pub since: Option<DateTime<Utc>>,

    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for entries touching one collection.
    pub fn for_collection(collection: Collection) -> Self {
        Self {
            collection: Some(collection.as_str().to_string()),
            ..Default::default()
        }
    }

    /// Creates a query for entries of one operation kind.
    pub fn for_operation(kind: OperationKind) -> Self {
        Self {
            operations: Some(vec![kind]),
            ..Default::default()
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn operations(mut self, operations: Vec<OperationKind>) -> Self {
        self.operations = Some(operations);
        self
    }

    pub fn since(mut self, timestamp: DateTime<Utc>) -> Self {
        self.since = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `entry` passes every filter.
    pub fn matches(&self, entry: &OperationLogEntry) -> bool {
        if let Some(collection) = &self.collection
            && &entry.collection != collection
        {
            return false;
        }
        if let Some(operations) = &self.operations
            && !operations.contains(&entry.operation)
        {
            return false;
        }
        if let Some(since) = self.since
            && entry.timestamp < since
        {
            return false;
        }
        true
    }
}
