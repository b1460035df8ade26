use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{auth::AuthenticatedPrincipal, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/:id", get(get_order))
}

/// Place an order from the principal's cart
async fn place_order(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .checkout
        .place_order(principal.id, payload.address_id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(order))
}

/// List the principal's orders, most recent first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(principal.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Get one order with address and lines
async fn get_order(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(principal.id, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub address_id: Uuid,
}
