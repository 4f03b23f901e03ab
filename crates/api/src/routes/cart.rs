//! Session cart endpoints.
//!
//! The session comes from the `x-session-id` header; see
//! [`crate::context`].

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{CartSnapshot, UnavailableLine};
use record_store::{RecordId, RecordStore};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: RecordId,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: RecordId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: RecordId,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: CartSnapshot,
    /// Lines asking for more than is currently in stock.
    pub unavailable: Vec<UnavailableLine>,
}

#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub removed: usize,
}

async fn cart_response<S: RecordStore + 'static>(
    state: &AppState<S>,
    context: &RequestContext,
) -> Result<Json<CartResponse>, ApiError> {
    let service = state.cart(context);
    Ok(Json(CartResponse {
        cart: service.snapshot(&context.session).await?,
        unavailable: service.unavailable_lines(&context.session).await?,
    }))
}

/// GET /api/cart
pub async fn get<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
) -> Result<Json<CartResponse>, ApiError> {
    cart_response(&state, &context).await
}

/// POST /api/cart/add
#[tracing::instrument(skip(state, context), fields(session = %context.session))]
pub async fn add<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    state
        .cart(&context)
        .add(&context.session, req.product_id, req.quantity)
        .await?;
    cart_response(&state, &context).await
}

/// POST /api/cart/update. A zero quantity removes the line.
#[tracing::instrument(skip(state, context), fields(session = %context.session))]
pub async fn update<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Json(req): Json<UpdateCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    state
        .cart(&context)
        .set_quantity(&context.session, req.product_id, req.quantity)
        .await?;
    cart_response(&state, &context).await
}

/// POST /api/cart/remove
#[tracing::instrument(skip(state, context), fields(session = %context.session))]
pub async fn remove<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Json(req): Json<RemoveFromCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    state
        .cart(&context)
        .remove(&context.session, req.product_id)
        .await?;
    cart_response(&state, &context).await
}

/// DELETE /api/cart
#[tracing::instrument(skip(state, context), fields(session = %context.session))]
pub async fn clear<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
) -> Result<Json<ClearCartResponse>, ApiError> {
    let removed = state.cart(&context).clear(&context.session).await?;
    Ok(Json(ClearCartResponse { removed }))
}
