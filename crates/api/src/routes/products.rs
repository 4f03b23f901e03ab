//! Product listing and administration.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::Money;
use domain::{Product, ProductFilter, ProductPatch};
use record_store::{RecordId, RecordStore};
use serde::Deserialize;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub category_id: RecordId,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<NewProductRequest> for Product {
    fn from(req: NewProductRequest) -> Self {
        let mut product = Product::new(req.name, req.price, req.category_id, req.stock_quantity);
        product.description = req.description;
        product.emoji = req.emoji;
        product.image_url = req.image_url;
        product
    }
}

/// GET /api/products?category=&search=&min_price=&max_price=
#[tracing::instrument(skip(state, context))]
pub async fn list<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog(&context).products(&filter).await?))
}

/// GET /api/products/{id}
pub async fn get<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog(&context).product(id).await?))
}

/// POST /api/products
#[tracing::instrument(skip(state, context, req))]
pub async fn create<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Json(req): Json<NewProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog(&context).create_product(req.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
#[tracing::instrument(skip(state, context, patch))]
pub async fn update<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog(&context).update_product(id, patch).await?))
}

/// DELETE /api/products/{id}
#[tracing::instrument(skip(state, context))]
pub async fn delete<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog(&context).delete_product(id).await?))
}
