//! Admin access for the audit endpoints.
//!
//! A shared key in the `x-admin-key` header, compared against
//! `ADMIN_API_KEY`. With no key configured the admin surface is disabled
//! (503), never open.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Proof that the request carried the admin key. Extract it before any
/// other argument so rejected requests never touch the log.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_api_key.as_deref() else {
            return Err(AppError::not_configured("admin key not configured on server"));
        };
        let presented = parts.headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(expected) {
            tracing::warn!(path = %parts.uri.path(), "rejected admin request");
            return Err(AppError::unauthorized("unauthorized"));
        }
        Ok(AdminAccess)
    }
}
