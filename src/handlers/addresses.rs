use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthenticatedPrincipal, errors::ApiError, services::addresses::CreateAddressInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Creates the router for address book endpoints
pub fn address_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_address))
        .route("/", get(list_addresses))
}

/// Create a shipping address
async fn create_address(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Json(payload): Json<CreateAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .create_address(
            principal.id,
            CreateAddressInput {
                full_name: payload.full_name,
                phone: payload.phone,
                line1: payload.line1,
                line2: payload.line2,
                city: payload.city,
                state: payload.state,
                postal_code: payload.postal_code,
                country: payload.country,
                is_default: payload.is_default,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(address))
}

/// List the principal's addresses
async fn list_addresses(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = state
        .services
        .addresses
        .list_addresses(principal.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(addresses))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAddressRequest {
    #[validate(length(min = 2))]
    pub full_name: String,
    #[validate(length(min = 8, max = 15))]
    pub phone: String,
    #[validate(length(min = 2))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 2))]
    pub city: String,
    #[validate(length(min = 2))]
    pub state: String,
    #[validate(length(min = 3))]
    pub postal_code: String,
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}
