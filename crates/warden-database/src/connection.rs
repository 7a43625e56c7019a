//! PostgreSQL connection pool management.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, warn};

use warden_core::config::DatabaseConfig;
use warden_core::error::{AppError, ErrorKind};

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    /// The underlying sqlx connection pool.
    pool: PgPool,
    /// Upper bound for a single health check.
    check_timeout: Duration,
}

impl DatabasePool {
    /// Create a new database pool from configuration.
    ///
    /// The URL is parsed up front; only `user@host:port/db` is ever logged.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = parse_options(&config.url)?;
        let target = target_summary(&options);

        info!(
            db = %target,
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to {target}"),
                    e,
                )
            })?;

        info!(db = %target, "Connected to PostgreSQL");
        Ok(Self {
            pool,
            check_timeout: Duration::from_secs(config.connect_timeout_seconds),
        })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `SELECT 1`, bounded by the connect timeout.
    ///
    /// A slow database counts as unreachable so `/health` never hangs on it.
    pub async fn health_check(&self) -> Result<(), AppError> {
        let ping = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool);

        match tokio::time::timeout(self.check_timeout, ping).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::with_source(
                ErrorKind::Database,
                "Database health check failed",
                e,
            )),
            Err(_) => {
                warn!(
                    timeout_ms = self.check_timeout.as_millis() as u64,
                    "Database health check timed out"
                );
                Err(AppError::database("Database health check timed out"))
            }
        }
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Parses a Postgres URL. A malformed URL is a configuration error, and
/// the URL itself is kept out of the message.
fn parse_options(url: &str) -> Result<PgConnectOptions, AppError> {
    PgConnectOptions::from_str(url).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            "database.url is not a valid PostgreSQL URL",
            e,
        )
    })
}

/// `user@host:port/database`, without credentials.
fn target_summary(options: &PgConnectOptions) -> String {
    format!(
        "{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or("")
    )
}
