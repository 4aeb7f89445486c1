// rest/auth.rs — Bearer-token extractor for authenticated routes.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::AppContext;

/// Extracts the authenticated user's id from `Authorization: Bearer <token>`.
///
/// Rejection maps through `ServiceError::Unauthorized` → 401.
pub struct AuthUser(pub String);

impl FromRequestParts<Arc<AppContext>> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ServiceError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ServiceError::Unauthorized)?;
        let user_id = crate::auth::authenticate(&ctx.storage, token).await?;
        Ok(AuthUser(user_id))
    }
}
