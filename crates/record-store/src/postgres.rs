use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::{
    Collection, RecordStoreError, Result,
    record::row_id,
    store::{RecordStore, validate_rows_for_save},
};

/// PostgreSQL-backed record store implementation.
///
/// Rows live in a single `records` table keyed by `(collection, id)` with
/// the row itself in a JSONB column.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and creates the store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let rows: Vec<Value> = sqlx::query_scalar(
            r#"
            SELECT data
            FROM records
            WHERE collection = $1
            ORDER BY id ASC
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn save(&self, collection: Collection, rows: Vec<Value>) -> Result<()> {
        validate_rows_for_save(collection, &rows)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM records WHERE collection = $1")
            .bind(collection.as_str())
            .execute(&mut *tx)
            .await?;

        for row in &rows {
            let id = row_id(row).ok_or(RecordStoreError::MissingId(collection))?;
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, data)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(collection.as_str())
            .bind(id.as_i64())
            .bind(row)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
