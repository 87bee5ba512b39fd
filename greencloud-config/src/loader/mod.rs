use std::{fs, path::PathBuf};

use thiserror::Error;
use url::Url;

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_EXP_SECONDS, DEFAULT_CONFIG_LOCATIONS,
    DEFAULT_CORS_MAX_AGE, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_HOST,
    DEFAULT_PASSWORD_PEPPER, DEFAULT_PORT, DEFAULT_REFRESH_TOKEN_EXP_SECONDS,
    default_cors_exposed_headers, default_cors_headers, default_cors_methods,
    default_cors_origin_patterns,
};
use crate::models::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, JwtConfig,
    RedisConfig, ServerConfig,
    sources::{EnvConfig, FileConfig},
};
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, reads the process environment and composes the result
    /// with the TOML file, if any.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Same as [`ConfigLoader::load`] but with a caller supplied environment
    /// layer. The process environment and `.env` files are not consulted.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;

        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No greencloud.toml detected; using environment variables and defaults",
                "Pass --config or set GREENCLOUD_CONFIG to use a configuration file",
            );
        }

        let config = compose_config(
            file_config.unwrap_or_default(),
            env,
            ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        )?;

        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let result = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };

        match result {
            Ok(()) => Ok(true),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let requested = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match requested {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file: FileConfig,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<Config, ConfigLoadError> {
    let FileConfig {
        server: file_server,
        database: file_database,
        redis: file_redis,
        jwt: file_jwt,
        auth: file_auth,
        cors: file_cors,
        dev_mode: file_dev_mode,
    } = file;

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let database_url = env
        .database_url
        .or(file_database.url)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    if let Some(url) = &database_url {
        check_database_url(url)?;
    }
    let database = DatabaseConfig {
        url: database_url,
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
    };

    let redis = env
        .redis_url
        .or_else(|| file_redis.map(|r| r.url))
        .filter(|url| !url.trim().is_empty())
        .map(|url| RedisConfig { url });

    let jwt = JwtConfig {
        secret: env.jwt_secret.or(file_jwt.secret),
        access_token_exp_seconds: env
            .jwt_access_token_exp_seconds
            .or(file_jwt.access_token_exp_seconds)
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXP_SECONDS),
        refresh_token_exp_seconds: env
            .jwt_refresh_token_exp_seconds
            .or(file_jwt.refresh_token_exp_seconds)
            .unwrap_or(DEFAULT_REFRESH_TOKEN_EXP_SECONDS),
    };

    let auth = AuthConfig {
        password_pepper: env
            .auth_password_pepper
            .or(file_auth.password_pepper)
            .unwrap_or_else(|| DEFAULT_PASSWORD_PEPPER.to_string()),
    };

    let cors = CorsConfig {
        allowed_origin_patterns: env
            .cors_allowed_origin_patterns
            .or(file_cors.allowed_origin_patterns)
            .unwrap_or_else(default_cors_origin_patterns),
        allowed_methods: env
            .cors_allowed_methods
            .or(file_cors.allowed_methods)
            .unwrap_or_else(default_cors_methods),
        allowed_headers: env
            .cors_allowed_headers
            .or(file_cors.allowed_headers)
            .unwrap_or_else(default_cors_headers),
        exposed_headers: env
            .cors_exposed_headers
            .or(file_cors.exposed_headers)
            .unwrap_or_else(default_cors_exposed_headers),
        allow_credentials: env
            .cors_allow_credentials
            .or(file_cors.allow_credentials)
            .unwrap_or(false),
        max_age: env
            .cors_max_age
            .or(file_cors.max_age)
            .unwrap_or(DEFAULT_CORS_MAX_AGE),
    };

    Ok(Config {
        server,
        database,
        redis,
        jwt,
        auth,
        cors,
        dev_mode: env.dev_mode.or(file_dev_mode).unwrap_or(false),
        metadata,
    })
}

fn check_database_url(raw: &str) -> Result<(), ConfigLoadError> {
    let parsed = Url::parse(raw)
        .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(()),
        other => Err(ConfigLoadError::UnsupportedDatabaseScheme {
            scheme: other.to_string(),
        }),
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid database URL")]
    InvalidDatabaseUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported database scheme '{scheme}', expected postgres")]
    UnsupportedDatabaseScheme { scheme: String },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dev_env() -> EnvConfig {
        EnvConfig {
            jwt_secret: Some(STANDARD.encode([3u8; 48])),
            dev_mode: Some(true),
            ..EnvConfig::default()
        }
    }

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn env_only_config_uses_defaults() {
        let load = ConfigLoader::new().load_with_env(dev_env()).unwrap();
        let config = load.config;

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.jwt.access_token_exp_seconds, 1800);
        assert_eq!(config.jwt.refresh_token_exp_seconds, 1_209_600);
        assert_eq!(config.cors.max_age, 3600);
        assert_eq!(config.cors.exposed_headers, vec!["Location".to_string()]);
        assert!(config.redis.is_none());
        assert!(!load.warnings.is_empty());
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = write_toml(
            r#"
            [server]
            host = "127.0.0.1"
            port = 7000

            [jwt]
            access_token_exp_seconds = 60

            [redis]
            url = "redis://cache:6379"
            "#,
        );

        let env = EnvConfig {
            server_port: Some(9000),
            ..dev_env()
        };
        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env)
            .unwrap();

        assert_eq!(load.config.server.host, "127.0.0.1");
        assert_eq!(load.config.server.port, 9000);
        assert_eq!(load.config.jwt.access_token_exp_seconds, 60);
        assert_eq!(
            load.config.redis.map(|r| r.url),
            Some("redis://cache:6379".to_string())
        );
        assert_eq!(
            load.config.metadata.config_path.as_deref(),
            Some(file.path())
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/definitely/not/here/greencloud.toml")
            .load_with_env(dev_env())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let file = write_toml("[server\nport = 1");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(dev_env())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }

    #[test]
    fn rejects_non_postgres_database_url() {
        let env = EnvConfig {
            database_url: Some("mysql://localhost/app".into()),
            ..dev_env()
        };
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::UnsupportedDatabaseScheme { .. }
        ));
    }

    #[test]
    fn guard_rails_run_after_composition() {
        let env = EnvConfig {
            jwt_secret: None,
            ..dev_env()
        };
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::MissingSecret {
                ..
            })
        ));
    }
}
