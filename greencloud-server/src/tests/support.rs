use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use greencloud_config::{
    CorsConfig,
    constants::{
        DEFAULT_CORS_MAX_AGE, default_cors_exposed_headers,
        default_cors_headers, default_cors_methods,
        default_cors_origin_patterns,
    },
};

use crate::AppState;
use crate::auth::InMemoryTokenStore;
use crate::auth::service::MockAuthService;
use crate::routes::create_router;
use crate::users::repository::MockUserRepository;

pub fn cors_config() -> CorsConfig {
    CorsConfig {
        allowed_origin_patterns: default_cors_origin_patterns(),
        allowed_methods: default_cors_methods(),
        allowed_headers: default_cors_headers(),
        exposed_headers: default_cors_exposed_headers(),
        allow_credentials: false,
        max_age: DEFAULT_CORS_MAX_AGE,
    }
}

pub fn healthy_users() -> MockUserRepository {
    let mut users = MockUserRepository::new();
    users.expect_ping().returning(|| Ok(()));
    users
}

pub fn router_with(auth: MockAuthService, users: MockUserRepository) -> Router {
    let state = AppState::new(
        Arc::new(auth),
        Arc::new(users),
        Arc::new(InMemoryTokenStore::new()),
    );
    create_router(state, &cors_config()).unwrap()
}

pub fn router(auth: MockAuthService) -> Router {
    router_with(auth, healthy_users())
}

pub fn server(auth: MockAuthService) -> TestServer {
    TestServer::new(router(auth)).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
