use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

/// Establishes a connection pool to the database.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool with custom pool settings.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    info!("Database connection established");
    Ok(pool)
}

/// Convenience wrapper building the pool from the application config.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection(&cfg.database_url).await
}
