//! Schema migrations and the post-migration schema check.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use warden_core::error::{AppError, ErrorKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Tables the access-control core reads and writes.
pub const REQUIRED_TABLES: [&str; 4] = ["principals", "roles", "role_permissions", "principal_roles"];

/// Applies pending migrations, then checks that every table in
/// [`REQUIRED_TABLES`] exists. A missing table means the database was
/// migrated by something else and is a configuration error.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0);
    info!(latest_version = latest, "Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Schema migration failed", e)
    })?;

    let present: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ANY($1)",
    )
    .bind(&REQUIRED_TABLES[..])
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Schema check failed", e))?;

    let missing = missing_tables(&present);
    if !missing.is_empty() {
        return Err(AppError::configuration(format!(
            "Database schema is missing tables: {}",
            missing.join(", ")
        )));
    }

    info!(latest_version = latest, "Schema is up to date");
    Ok(())
}

fn missing_tables(present: &[String]) -> Vec<&'static str> {
    REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !present.iter().any(|p| p == table))
        .collect()
}
