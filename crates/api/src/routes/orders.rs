//! Checkout and order administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{CustomerDetails, Order, OrderDetails, OrderStatus};
use record_store::{RecordId, RecordStore};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 50;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

impl From<PlaceOrderRequest> for CustomerDetails {
    fn from(req: PlaceOrderRequest) -> Self {
        CustomerDetails {
            name: req.customer_name,
            email: req.customer_email,
            phone: req.customer_phone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: RecordId,
    pub order: OrderDetails,
}

// -- Handlers --

/// POST /api/orders: check out the caller's cart.
///
/// The transaction runs on its own task so a client that disconnects
/// mid-request cannot abandon it half-way.
#[tracing::instrument(skip(state, context, req), fields(session = %context.session))]
pub async fn create<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    let checkout = state.checkout(&context);
    let session = context.session.clone();
    let customer = CustomerDetails::from(req);

    let order_id =
        tokio::spawn(async move { checkout.place_order(&session, customer).await }).await??;

    let order = state.orders(&context).get(order_id).await?;
    Ok((StatusCode::CREATED, Json(OrderPlacedResponse { order_id, order })))
}

/// GET /api/orders?status=&limit=&offset=, newest first with items.
pub async fn list<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    let service = state.orders(&context);
    let orders: Vec<Order> = match query.status {
        Some(status) => service.by_status(status).await?,
        None => service.list(usize::MAX, 0).await?,
    };

    let page = orders
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(DEFAULT_PAGE_SIZE));

    let mut details = Vec::new();
    for order in page {
        let items = match order.id {
            Some(id) => service.items(id).await?,
            None => Vec::new(),
        };
        details.push(OrderDetails { order, items });
    }
    Ok(Json(details))
}

/// GET /api/orders/{id}
pub async fn get<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(state.orders(&context).get(id).await?))
}

/// PUT /api/orders/{id}/status
#[tracing::instrument(skip(state, context))]
pub async fn update_status<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state.orders(&context).update_status(id, req.status).await?,
    ))
}

/// DELETE /api/orders/{id}: removes the order and restocks its items.
#[tracing::instrument(skip(state, context))]
pub async fn delete<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    context: RequestContext,
    Path(id): Path<RecordId>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(state.orders(&context).delete(id).await?))
}
