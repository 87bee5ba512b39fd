use std::sync::Arc;

use anyhow::Context;
use greencloud_config::{Config, ConfigWarnings, validation::decode_jwt_secret};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::app_state::AppState;
use crate::MIGRATOR;
use crate::auth::{
    AuthServiceImpl, InMemoryTokenStore, JwtTokenProvider, PasswordHasher,
    RedisTokenStore, TokenStore,
};
use crate::routes::create_router;
use crate::users::{PostgresUserRepository, UserRepository};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=warn,sqlx=warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn log_config_warnings(warnings: &ConfigWarnings) {
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }
}

pub async fn connect_postgres(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL must be set to connect to PostgreSQL")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!(
        max_connections = config.database.max_connections,
        "connected to PostgreSQL"
    );
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("database migration failed")?;
    info!("database migrations applied");
    Ok(())
}

async fn connect_token_store(
    config: &Config,
) -> anyhow::Result<Arc<dyn TokenStore>> {
    match &config.redis {
        Some(redis) => {
            let store = RedisTokenStore::connect(&redis.url)
                .await
                .context("failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("using in-memory token store; tokens are lost on restart");
            Ok(Arc::new(InMemoryTokenStore::new()))
        }
    }
}

/// Wires repositories, token store and the auth service from config.
pub async fn build_state(
    config: &Config,
    pool: PgPool,
) -> anyhow::Result<AppState> {
    let secret = decode_jwt_secret(config.jwt.secret.as_deref())
        .context("invalid JWT secret")?;
    let jwt = JwtTokenProvider::new(
        &secret,
        config.jwt.access_ttl(),
        config.jwt.refresh_ttl(),
    )
    .context("invalid JWT settings")?;
    let hasher = Arc::new(
        PasswordHasher::new(&config.auth.password_pepper, &secret)
            .context("failed to initialise password hasher")?,
    );

    let users: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool));
    let tokens = connect_token_store(config).await?;

    let auth = Arc::new(AuthServiceImpl::new(
        users.clone(),
        tokens.clone(),
        jwt,
        hasher,
    ));

    Ok(AppState::new(auth, users, tokens))
}

/// Binds the configured address and serves until Ctrl-C / SIGTERM.
pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state, &config.cors)
        .context("invalid CORS origin pattern")?;

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
