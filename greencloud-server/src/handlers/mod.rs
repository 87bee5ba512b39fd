pub mod auth;
pub mod extract;
pub mod health;
pub mod users;

use axum::{extract::Request, http::StatusCode};

use crate::auth::AuthenticatedUser;
use crate::infra::errors::AppError;

/// Anonymous callers outside the public prefixes get 401 for anything the
/// router cannot serve, so the route table is not disclosed.
fn hidden_from(request: &Request) -> Option<AppError> {
    let path = request.uri().path();
    let public = path.starts_with("/api/auth/") || path.starts_with("/actuator/");
    if !public && request.extensions().get::<AuthenticatedUser>().is_none() {
        return Some(AppError::unauthorized("unauthorized"));
    }
    None
}

/// Unmatched paths.
pub async fn fallback(request: Request) -> AppError {
    hidden_from(&request).unwrap_or_else(|| AppError::not_found("not found"))
}

pub async fn method_not_allowed(request: Request) -> AppError {
    hidden_from(&request).unwrap_or_else(|| {
        AppError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    })
}
