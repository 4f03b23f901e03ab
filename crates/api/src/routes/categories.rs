//! Category listing and administration.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Category, CategoryPatch, CategoryWithCount};
use record_store::{RecordId, RecordStore};
use serde::Deserialize;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GET /api/categories, each with its product count.
pub async fn list<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(state.catalog(&context).categories_with_counts().await?))
}

/// POST /api/categories
#[tracing::instrument(skip(state, context, req))]
pub async fn create<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Json(req): Json<NewCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let mut category = Category::new(req.name);
    category.description = req.description;
    let category = state.catalog(&context).create_category(category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id}
#[tracing::instrument(skip(state, context, patch))]
pub async fn update<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog(&context).update_category(id, patch).await?))
}

/// DELETE /api/categories/{id}
#[tracing::instrument(skip(state, context))]
pub async fn delete<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog(&context).delete_category(id).await?))
}
