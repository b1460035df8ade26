use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    auth::AuthenticatedPrincipal, errors::ApiError, services::payments::ConfirmPaymentInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for payment endpoints
pub fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/intent", post(create_intent))
        .route("/confirm", post(confirm_payment))
}

/// Create a remote payment intent for a pending order
async fn create_intent(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intent = state
        .services
        .payments
        .create_intent(principal.id, payload.order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(intent))
}

/// Confirm a payment completion reported by the gateway's checkout flow
async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .payments
        .confirm_payment(
            principal.id,
            ConfirmPaymentInput {
                order_id: payload.order_id,
                remote_order_id: payload.remote_order_id,
                remote_payment_id: payload.remote_payment_id,
                signature: payload.signature,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Payment verified. Order marked PAID."
    })))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1))]
    pub remote_order_id: String,
    #[validate(length(min = 1))]
    pub remote_payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}
