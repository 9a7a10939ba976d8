use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use souq_order::{Order, PlacementReceipt, PlacementRequest};
use souq_shared::CustomerIdentity;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(place_order))
        .route("/api/orders/{order_number}", get(get_order))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal_minor: i64,
    pub shipping_minor: i64,
    pub promotions_minor: i64,
    pub total_minor: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: Order,
    pub totals: OrderTotals,
}

/// Identity asserted by the gateway, if any. Invalid ids are ignored and the
/// request proceeds as a guest checkout.
fn identity_from_headers(headers: &HeaderMap) -> Option<CustomerIdentity> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .map(CustomerIdentity::from_id)
}

/// POST /api/orders
/// Place an order: price every line, apply all mutations atomically.
pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PlacementRequest>,
) -> Result<(StatusCode, Json<PlacementReceipt>), AppError> {
    let identity = identity_from_headers(&headers);
    let receipt = state.committer.place(&request, identity.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/orders/:order_number
/// Retrieve a committed order with derived totals.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let order = state
        .orders
        .order_by_number(&order_number)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("order not found: {order_number}")))?;

    // Subtotal is shown pre-discount so subtotal + promotions == total.
    let savings = order.flash_savings_minor();
    let totals = OrderTotals {
        subtotal_minor: order.total_minor + savings,
        shipping_minor: 0,
        promotions_minor: -savings,
        total_minor: order.total_minor,
    };

    Ok(Json(OrderDetailResponse { order, totals }))
}
