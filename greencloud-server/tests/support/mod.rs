use std::sync::Arc;
use std::time::Duration;

use argon2::Params;
use greencloud_config::{
    CorsConfig,
    constants::{
        DEFAULT_CORS_MAX_AGE, default_cors_exposed_headers,
        default_cors_headers, default_cors_methods,
        default_cors_origin_patterns,
    },
};
use greencloud_server::AppState;
use greencloud_server::auth::{
    AuthServiceImpl, InMemoryTokenStore, JwtTokenProvider, PasswordHasher,
    TokenStore,
};
use greencloud_server::users::{PostgresUserRepository, UserRepository};
use sqlx::PgPool;

pub const SECRET: [u8; 32] = [7u8; 32];

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

/// Real repository and service, cheap hashing, in-process token store.
pub fn build_state(pool: PgPool) -> anyhow::Result<AppState> {
    let jwt = JwtTokenProvider::new(
        &SECRET,
        Duration::from_secs(1800),
        Duration::from_secs(1_209_600),
    )?;
    let params = Params::new(8, 1, 1, None)
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    let hasher = Arc::new(PasswordHasher::with_params(
        "integration-pepper",
        SECRET,
        params,
    )?);

    let users: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool));
    let tokens: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    let auth = Arc::new(AuthServiceImpl::new(
        users.clone(),
        tokens.clone(),
        jwt,
        hasher,
    ));

    Ok(AppState::new(auth, users, tokens))
}
