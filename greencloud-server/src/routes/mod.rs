pub mod paths;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use greencloud_config::CorsConfig;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{authenticate, require_authenticated};
use crate::handlers::{self, auth, health, users};
use crate::infra::app_state::AppState;
use crate::infra::cors::{
    OriginPolicy, build_cors_layer, reject_disallowed_origins,
};

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route(paths::SIGN_UP, post(auth::sign_up))
        .route(paths::SIGN_IN, post(auth::sign_in))
        .route(paths::REFRESH, post(auth::refresh))
        .route(paths::LOGOUT, post(auth::logout))
        .route(paths::CHECK_EMAIL, get(auth::check_email))
        .route(paths::HEALTH, get(health::health))
        .route(paths::INFO, get(health::info))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(paths::CURRENT_USER, get(users::me))
        .route_layer(middleware::from_fn(require_authenticated))
}

/// Full application router, layered outer to inner: origin rejection, CORS,
/// tracing, bearer authentication.
pub fn create_router(
    state: AppState,
    cors: &CorsConfig,
) -> Result<Router, regex::Error> {
    let policy = Arc::new(OriginPolicy::new(&cors.allowed_origin_patterns)?);

    let router = Router::new()
        .merge(public_routes())
        .merge(protected_routes())
        .fallback(handlers::fallback)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors, policy.clone()))
        .layer(middleware::from_fn_with_state(
            policy,
            reject_disallowed_origins,
        ));

    Ok(router)
}
