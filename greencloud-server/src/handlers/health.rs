use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

use crate::infra::app_state::AppState;

fn status(up: bool) -> &'static str {
    if up { "UP" } else { "DOWN" }
}

/// Probes PostgreSQL and the token store. Any component down turns the
/// aggregate status DOWN with 503.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (db, redis) = tokio::join!(state.users.ping(), state.tokens.ping());

    if let Err(err) = &db {
        warn!(error = %err, "database health check failed");
    }
    if let Err(err) = &redis {
        warn!(error = %err, "token store health check failed");
    }

    let up = db.is_ok() && redis.is_ok();
    let code = if up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status(up),
            "components": {
                "db": { "status": status(db.is_ok()) },
                "redis": { "status": status(redis.is_ok()) },
            }
        })),
    )
}

pub async fn info() -> Json<Value> {
    Json(json!({
        "app": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
