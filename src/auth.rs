use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::ApiError;

/// Header carrying the authenticated principal id.
///
/// Identity is an external collaborator: the edge/identity layer terminates
/// credentials and forwards the principal id, which the core trusts as given.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// Authenticated principal extracted from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self { id })
    }
}
