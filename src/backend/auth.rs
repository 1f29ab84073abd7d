use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::backend::AppState;
use crate::error::AppError;
use crate::identity::{self, Owner};

/// The caller's identity, taken from `Authorization: Bearer <token>` and
/// nowhere else.
#[async_trait]
impl FromRequestParts<AppState> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let owner = state.verifier.verify(token)?;
        tracing::debug!(user = %owner.as_str(), "authenticated request");
        identity::sign_in(&state.db, &owner).await?;
        Ok(owner)
    }
}
