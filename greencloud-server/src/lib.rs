//! Authentication backend: sign-up, sign-in with JWT access/refresh tokens,
//! token rotation, logout with access-token blacklisting, and email
//! availability checks. PostgreSQL holds users; Redis holds refresh tokens
//! and the blacklist.

pub mod auth;
pub mod handlers;
pub mod infra;
pub mod routes;
pub mod users;

#[cfg(test)]
mod tests;

pub use infra::app_state::AppState;
pub use infra::errors::{AppError, AppResult};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
