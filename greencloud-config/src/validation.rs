use axum::http::{Method, header::HeaderName};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

use super::models::{AuthConfig, Config, CorsConfig, JwtConfig};

/// HS256 keys shorter than the digest size are refused.
pub const MIN_JWT_SECRET_BYTES: usize = 32;
pub const MIN_PEPPER_LENGTH: usize = 32;
/// Ten years. Longer lifetimes overflow clock arithmetic and Redis `EX`.
pub const MAX_TOKEN_LIFETIME_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} must be set")]
    MissingSecret { field: &'static str },
    #[error("authentication secret {field} {reason}")]
    WeakSecret { field: &'static str, reason: String },
    #[error(
        "{field} must be between 1 and {max} seconds",
        max = MAX_TOKEN_LIFETIME_SECONDS
    )]
    InvalidTokenLifetime { field: &'static str },
    #[error("CORS wildcard origins are not allowed when DEV_MODE is false")]
    DangerousCorsWildcard,
    #[error("invalid CORS configuration: {reason}")]
    InvalidCorsConfig { reason: String },
    #[error("REDIS_URL must be set when DEV_MODE is false")]
    MissingRedis,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    validate_jwt(&config.jwt)?;
    enforce_pepper(&config.auth, config.dev_mode, &mut warnings)?;

    if !config.dev_mode && config.cors.is_wildcard_included() {
        return Err(ConfigGuardRailError::DangerousCorsWildcard);
    }
    validate_cors(&config.cors)?;

    if config.redis.is_none() {
        if !config.dev_mode {
            return Err(ConfigGuardRailError::MissingRedis);
        }
        warnings.push_with_hint(
            "REDIS_URL not configured; refresh tokens and logout blacklist are kept in memory",
            "Set REDIS_URL so tokens survive restarts and are shared between instances",
        );
    }

    if config.database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured; the server cannot start without PostgreSQL",
            "Set DATABASE_URL or add a [database] url entry to greencloud.toml",
        );
    }

    Ok(warnings)
}

/// Decodes the configured signing secret, enforcing the minimum key size.
pub fn decode_jwt_secret(
    secret: Option<&str>,
) -> Result<Vec<u8>, ConfigGuardRailError> {
    let secret = secret
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigGuardRailError::MissingSecret {
            field: "JWT_SECRET",
        })?;

    let bytes = STANDARD.decode(secret).map_err(|_| {
        ConfigGuardRailError::WeakSecret {
            field: "JWT_SECRET",
            reason: "is not valid base64".into(),
        }
    })?;

    if bytes.len() < MIN_JWT_SECRET_BYTES {
        return Err(ConfigGuardRailError::WeakSecret {
            field: "JWT_SECRET",
            reason: format!(
                "must decode to at least {MIN_JWT_SECRET_BYTES} bytes"
            ),
        });
    }

    Ok(bytes)
}

fn validate_jwt(jwt: &JwtConfig) -> Result<(), ConfigGuardRailError> {
    decode_jwt_secret(jwt.secret.as_deref())?;

    check_lifetime(jwt.access_token_exp_seconds, "JWT_ACCESS_TOKEN_EXP_SECONDS")?;
    check_lifetime(
        jwt.refresh_token_exp_seconds,
        "JWT_REFRESH_TOKEN_EXP_SECONDS",
    )?;

    Ok(())
}

fn check_lifetime(
    seconds: u64,
    field: &'static str,
) -> Result<(), ConfigGuardRailError> {
    if seconds == 0 || seconds > MAX_TOKEN_LIFETIME_SECONDS {
        return Err(ConfigGuardRailError::InvalidTokenLifetime { field });
    }
    Ok(())
}

fn enforce_pepper(
    auth: &AuthConfig,
    dev_mode: bool,
    warnings: &mut ConfigWarnings,
) -> Result<(), ConfigGuardRailError> {
    if dev_mode {
        if auth.is_default_pepper() {
            warnings.push_with_hint(
                "AUTH_PASSWORD_PEPPER uses the placeholder value",
                "Generate a random pepper before leaving dev mode; changing it later invalidates stored passwords",
            );
        }
        return Ok(());
    }

    if auth.is_default_pepper() {
        return Err(ConfigGuardRailError::WeakSecret {
            field: "AUTH_PASSWORD_PEPPER",
            reason: "uses the default placeholder value".into(),
        });
    }

    if auth.password_pepper.len() < MIN_PEPPER_LENGTH {
        return Err(ConfigGuardRailError::WeakSecret {
            field: "AUTH_PASSWORD_PEPPER",
            reason: format!("must be at least {MIN_PEPPER_LENGTH} characters"),
        });
    }

    Ok(())
}

fn validate_cors(cors: &CorsConfig) -> Result<(), ConfigGuardRailError> {
    if cors.allowed_methods.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason:
                "CORS_ALLOWED_METHODS must include at least one HTTP method"
                    .into(),
        });
    }

    for method in &cors.allowed_methods {
        Method::from_bytes(method.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!(
                    "invalid HTTP method `{}` in CORS_ALLOWED_METHODS",
                    method
                ),
            }
        })?;
    }

    if cors.allowed_headers.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason:
                "CORS_ALLOWED_HEADERS must include at least one header name"
                    .into(),
        });
    }

    let named_headers = cors
        .allowed_headers
        .iter()
        .chain(cors.exposed_headers.iter())
        .filter(|h| h.trim() != "*");
    for header in named_headers {
        HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!("invalid header name `{}`", header),
            }
        })?;
    }

    if cors.allow_credentials && cors.is_wildcard_included() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason: "credentials cannot be allowed for a wildcard origin"
                .into(),
        });
    }

    Ok(())
}
