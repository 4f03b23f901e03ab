use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::RecordId;

/// A named collection of records of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Categories,
    Products,
    Orders,
    OrderItems,
    CartItems,
    OperationLogs,
}

impl Collection {
    /// Every collection, in dependency order.
    pub const ALL: [Collection; 6] = [
        Collection::Categories,
        Collection::Products,
        Collection::Orders,
        Collection::OrderItems,
        Collection::CartItems,
        Collection::OperationLogs,
    ];

    /// Returns the collection name used by every backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::Products => "products",
            Collection::Orders => "orders",
            Collection::OrderItems => "order_items",
            Collection::CartItems => "cart_items",
            Collection::OperationLogs => "operation_logs",
        }
    }

    /// Looks up a collection by name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entity stored as one row of a collection.
///
/// Rows are JSON objects carrying an integer `id` field. A record whose
/// id is `None` has not been persisted yet; the store assigns one on
/// insert.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection holding this entity kind.
    const COLLECTION: Collection;

    /// Partial update shape. Fields serialized by the patch replace the
    /// stored ones; fields it omits are retained.
    type Patch: Serialize + Send + Sync;

    /// Returns the record's identity, if assigned.
    fn id(&self) -> Option<RecordId>;

    /// Assigns the record's identity.
    fn set_id(&mut self, id: RecordId);

    /// Stamps the creation time.
    fn stamp_created(&mut self, at: DateTime<Utc>);

    /// Stamps the modification time, for entities that track one.
    fn stamp_updated(&mut self, _at: DateTime<Utc>) {}
}

/// Reads the integer `id` field of a stored row.
pub(crate) fn row_id(row: &serde_json::Value) -> Option<RecordId> {
    row.get("id")
        .and_then(serde_json::Value::as_i64)
        .map(RecordId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::parse(collection.as_str()), Some(collection));
        }
        assert_eq!(Collection::parse("users"), None);
    }

    #[test]
    fn collection_serializes_as_name() {
        let json = serde_json::to_string(&Collection::OrderItems).unwrap();
        assert_eq!(json, "\"order_items\"");
    }

    #[test]
    fn row_id_reads_integer_field() {
        assert_eq!(
            row_id(&serde_json::json!({"id": 7, "name": "x"})),
            Some(RecordId::new(7))
        );
        assert_eq!(row_id(&serde_json::json!({"name": "x"})), None);
        assert_eq!(row_id(&serde_json::json!({"id": "7"})), None);
    }
}
