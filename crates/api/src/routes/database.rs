//! Store statistics, the operation log and SQL export.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use domain::{LOW_STOCK_THRESHOLD, OrderStatistics, Product, ProductFilter};
use record_store::{Collection, LogQuery, OperationKind, OperationLogEntry, RecordStore, StoreStats};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub backend: &'static str,
    pub total_products: usize,
    pub total_categories: usize,
    /// Distinct lines in the caller's cart.
    pub cart_items: usize,
    pub orders: OrderStatistics,
    pub low_stock_products: Vec<Product>,
    pub store: StoreStats,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub operation: Option<OperationKind>,
}

impl LogsQuery {
    fn to_log_query(&self) -> Result<LogQuery, ApiError> {
        let mut query = LogQuery::new().limit(self.limit.unwrap_or(DEFAULT_LOG_LIMIT));
        if let Some(name) = self.collection.as_deref() {
            if name != record_store::MULTIPLE_COLLECTIONS && Collection::parse(name).is_none() {
                return Err(ApiError::BadRequest(format!("Unknown collection '{name}'")));
            }
            query = query.collection(name);
        }
        if let Some(kind) = self.operation {
            query = query.operations(vec![kind]);
        }
        Ok(query)
    }
}

/// GET /api/stats
pub async fn stats<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
) -> Result<Json<StatsResponse>, ApiError> {
    let catalog = state.catalog(&context);
    let products = catalog.products(&ProductFilter::default()).await?;

    Ok(Json(StatsResponse {
        backend: state.backend,
        total_products: products.len(),
        total_categories: catalog.categories().await?.len(),
        cart_items: state.cart(&context).lines(&context.session).await?.len(),
        orders: state.orders(&context).statistics().await?,
        low_stock_products: state.ledger(&context).low_stock(LOW_STOCK_THRESHOLD).await?,
        store: state.records.stats().await?,
    }))
}

/// GET /api/database/logs?limit=&collection=&operation=, newest first.
pub async fn logs<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<Vec<OperationLogEntry>>, ApiError> {
    let query = params.to_log_query()?;
    Ok(Json(state.records.logs(&query).await?))
}

/// GET /api/database/export, as a downloadable SQL script.
#[tracing::instrument(skip(state))]
pub async fn export<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ApiError> {
    let sql = state.records.export_sql().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/sql; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sports_nutrition_export.sql\"",
            ),
        ],
        sql,
    ))
}
