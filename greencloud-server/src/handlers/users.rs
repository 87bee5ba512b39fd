use axum::{Extension, Json, extract::State};
use greencloud_model::{ApiResponse, UserProfile};

use crate::auth::AuthenticatedUser;
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.auth.current_user(user.id).await?;
    Ok(Json(ApiResponse::success_with("ok", profile)))
}
