use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::service::{AuthError, AuthenticatedUser};
use crate::infra::{app_state::AppState, errors::AppError};

/// Resolves a bearer access token into an [`AuthenticatedUser`] extension.
/// Requests without a usable token continue anonymously.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).map(str::to_owned);
    if let Some(token) = token {
        match state.auth.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(AuthError::InvalidToken | AuthError::UserNotFound) => {}
            Err(err) => {
                warn!(error = %err, "token check failed, continuing anonymously");
            }
        }
    }

    next.run(request).await
}

/// Rejects anonymous requests. Must run after [`authenticate`].
pub async fn require_authenticated(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return AppError::unauthorized("unauthorized").into_response();
    }
    next.run(request).await
}

/// Returns the token from `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
