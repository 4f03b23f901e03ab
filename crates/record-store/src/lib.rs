//! Keyed collection storage for the storefront.
//!
//! A [`RecordStore`] backend persists whole collections of JSON rows. The
//! typed [`Records`] facade layers identity assignment, shallow-merge
//! updates, the operation log and collection snapshots on top of any
//! backend.

pub mod error;
pub mod json_file;
pub mod memory;
pub mod oplog;
pub mod postgres;
pub mod query;
pub mod record;
pub mod records;
pub mod snapshot;
pub mod store;

pub use common::RecordId;
pub use error::{RecordStoreError, Result};
pub use json_file::JsonFileRecordStore;
pub use memory::InMemoryRecordStore;
pub use oplog::{
    DailyFileSink, LOG_CAPACITY, MULTIPLE_COLLECTIONS, OperationKind, OperationLog,
    OperationLogEntry, OperationLogEntryBuilder,
};
pub use postgres::PostgresRecordStore;
pub use query::LogQuery;
pub use record::{Collection, Record};
pub use records::{Records, StoreStats, WriteGuard};
pub use snapshot::CollectionSnapshot;
pub use store::{RecordStore, RecordStoreExt};
