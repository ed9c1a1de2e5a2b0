use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration, layered from defaults, `config/*.toml` files and
/// `APP__`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,

    pub jwt_secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub auth_issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub auth_audience: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

fn default_jwt_issuer() -> String {
    "packhouse-auth".to_string()
}

fn default_jwt_audience() -> String {
    "packhouse-api".to_string()
}

fn default_jwt_expiration() -> u64 {
    3600
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "dev"
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.cors_allow_any_origin || self.is_development()
    }

    fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err("database_url must not be empty".into());
        }
        if self.jwt_secret.len() < 32 {
            return Err("jwt_secret must be at least 32 characters".into());
        }
        if self.port == 0 {
            return Err("port must be non-zero".into());
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Loads configuration for the environment named by `RUN_ENV`/`APP_ENV`.
///
/// `jwt_secret` has no default — it must be provided via environment variable
/// or config file so an insecure placeholder never reaches production.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://packhouse.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET with a secure random string.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes the global tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("packhouse_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite://test.db".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            environment: "development".into(),
            log_level: "debug".into(),
            log_json: false,
            jwt_secret: "0123456789abcdef0123456789abcdef".into(),
            auth_issuer: default_jwt_issuer(),
            auth_audience: default_jwt_audience(),
            jwt_expiration: 3600,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn development_allows_permissive_cors() {
        let cfg = base_config();
        assert!(cfg.should_allow_permissive_cors());
    }
}
