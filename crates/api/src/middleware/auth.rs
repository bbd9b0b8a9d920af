//! # Caller Identity
//!
//! Token verification happens upstream. The authenticator in front of this
//! service forwards the verified caller as two headers, which [`Caller`]
//! extracts. Booking itself makes no authorization decisions; route-level
//! role checks live here.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName},
};
use clinic_core::models::identity::{CallerIdentity, Role};

use super::error_handling::AppError;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

/// The verified caller of the current request
#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

fn header<'a>(parts: &'a Parts, name: &HeaderName) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized("A caller identity is required".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("Invalid {} header", name)))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, &USER_ID_HEADER)?
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))?;
        let role = header(parts, &USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|_| AppError::Unauthorized(format!("Invalid {} header", USER_ROLE_HEADER)))?;

        Ok(Caller(CallerIdentity { user_id, role }))
    }
}

/// Rejects the request unless the caller holds one of `roles`
pub fn require_role(caller: &Caller, roles: &[Role]) -> Result<(), AppError> {
    if caller.0.has_any_role(roles) {
        Ok(())
    } else {
        tracing::warn!(
            "Caller {} with role {} denied; requires one of {:?}",
            caller.0.user_id,
            caller.0.role,
            roles
        );
        Err(AppError::Forbidden(
            "Access forbidden: insufficient rights".to_string(),
        ))
    }
}
