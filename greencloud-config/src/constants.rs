pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_ACCESS_TOKEN_EXP_SECONDS: u64 = 30 * 60;
pub const DEFAULT_REFRESH_TOKEN_EXP_SECONDS: u64 = 14 * 24 * 60 * 60;

/// Placeholder pepper; accepted only in dev mode.
pub const DEFAULT_PASSWORD_PEPPER: &str = "change-me-password-pepper";

pub const DEFAULT_CORS_MAX_AGE: u64 = 3600;

pub fn default_cors_origin_patterns() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}

pub fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn default_cors_headers() -> Vec<String> {
    vec!["*".into()]
}

pub fn default_cors_exposed_headers() -> Vec<String> {
    vec!["Location".into()]
}

pub const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["greencloud.toml", "config/greencloud.toml"];
