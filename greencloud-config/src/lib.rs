//! Configuration for the GreenCloud server.
//!
//! Values are layered: an optional `.env` file is loaded first, then an
//! optional TOML file, then process environment variables override the
//! file. Anything still unset falls back to the defaults in [`constants`].
//! The composed [`Config`] is run through guard rails before it is handed to
//! the server, so a misconfigured production deployment fails at startup
//! rather than on the first request.

pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, JwtConfig,
    RedisConfig, ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
