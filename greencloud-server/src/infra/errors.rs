use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use greencloud_model::{ApiResponse, FieldErrors};
use serde_json::Value;
use std::fmt;

use crate::auth::AuthError;

pub type AppResult<T> = Result<T, AppError>;

/// Error rendered as a failed [`ApiResponse`] envelope.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub data: Option<Value>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn validation(errors: FieldErrors) -> Self {
        let data = serde_json::to_value(errors).unwrap_or(Value::Null);
        Self::bad_request("validation failed").with_data(data)
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::bad_request(format!("missing parameter: {name}"))
    }

    pub fn malformed_body() -> Self {
        Self::bad_request("malformed request body")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.data {
            Some(data) => ApiResponse::fail_with(self.message, data),
            None => ApiResponse::<Value>::fail(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DuplicateEmail => Self::conflict("email already used"),
            AuthError::BadCredentials => {
                Self::unauthorized("invalid email or password")
            }
            AuthError::InvalidToken => Self::unauthorized("invalid token"),
            AuthError::UserNotFound => Self::not_found("user not found"),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::internal()
            }
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStoreError;

    #[test]
    fn auth_errors_map_to_statuses() {
        let cases = [
            (AuthError::DuplicateEmail, StatusCode::CONFLICT),
            (AuthError::BadCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (
                AuthError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AuthError::TokenStore(TokenStoreError::Redis(
            redis::Client::open("not-a-redis-url").unwrap_err(),
        ));
        let app = AppError::from(err);
        assert_eq!(app.message, "internal error");
        assert!(app.data.is_none());
    }

    #[test]
    fn validation_errors_carry_field_map() {
        let mut errors = FieldErrors::default();
        errors.add("email", "required");
        let app = AppError::from(errors);
        assert_eq!(app.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.message, "validation failed");
        assert_eq!(app.data, Some(serde_json::json!({ "email": "required" })));
    }
}
