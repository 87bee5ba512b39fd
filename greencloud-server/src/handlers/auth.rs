use axum::{Json, extract::State, http::HeaderMap};
use greencloud_model::{
    ApiResponse, AuthTokens, EmailAvailability, LogoutRequest, SignInRequest,
    SignUpRequest, Validate,
    validation::{FieldErrors, validate_email_field},
};
use serde::Deserialize;

use super::extract::{ApiJson, ApiQuery, required};
use crate::auth::middleware::bearer_token;
use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshParams {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailParams {
    pub email: Option<String>,
}

pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignUpRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    request.validate()?;
    state.auth.sign_up(request).await?;
    Ok(Json(ApiResponse::success("signed up")))
}

pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignInRequest>,
) -> AppResult<Json<ApiResponse<AuthTokens>>> {
    request.validate()?;
    let tokens = state.auth.sign_in(request).await?;
    Ok(Json(ApiResponse::success_with("login success", tokens)))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RefreshParams>,
) -> AppResult<Json<ApiResponse<AuthTokens>>> {
    let refresh_token = required(params.refresh_token, "refreshToken")?;
    let tokens = state.auth.refresh(&refresh_token).await?;
    Ok(Json(ApiResponse::success_with("token refreshed", tokens)))
}

/// The bearer header is optional; without it only the refresh token is
/// revoked.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LogoutRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    request.validate()?;
    let access_token = bearer_token(&headers).unwrap_or_default();
    state
        .auth
        .logout(access_token, &request.refresh_token)
        .await;
    Ok(Json(ApiResponse::success("logged out")))
}

pub async fn check_email(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<EmailParams>,
) -> AppResult<Json<ApiResponse<EmailAvailability>>> {
    let email = required(params.email, "email")?;

    let mut errors = FieldErrors::default();
    validate_email_field(&email, &mut errors);
    errors.into_result()?;

    let available = state.auth.is_email_available(&email).await?;
    Ok(Json(ApiResponse::success_with(
        "ok",
        EmailAvailability { available },
    )))
}
