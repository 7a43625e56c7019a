//! Principal repository implementation.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_entity::principal::{CreatePrincipal, Principal};

use crate::scope::ScopedQuery;

/// Repository for principals and their role assignments.
///
/// `find_by_id` and `find_by_username` are identity lookups that run before
/// a tenant context exists. Tenant-facing reads go through [`Self::list`],
/// which only accepts a [`ScopedQuery`].
#[derive(Debug, Clone)]
pub struct PrincipalRepository {
    pool: PgPool,
}

impl PrincipalRepository {
    /// Create a new principal repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a principal by primary key, with its role assignments.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find principal by id", e)
            })?;

        self.with_roles(principal).await
    }

    /// Find a principal by username (case-insensitive), with its role
    /// assignments.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find principal by username", e)
        })?;

        self.with_roles(principal).await
    }

    /// List principals matching a tenant-scoped query.
    pub async fn list(&self, query: ScopedQuery<Principal>) -> AppResult<Vec<Principal>> {
        let mut principals = query.fetch_all(&self.pool).await?;
        if principals.is_empty() {
            return Ok(principals);
        }

        let ids: Vec<Uuid> = principals.iter().map(|p| p.id).collect();
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT principal_id, role_id FROM principal_roles WHERE principal_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role assignments", e)
        })?;

        let mut by_principal: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (principal_id, role_id) in rows {
            by_principal.entry(principal_id).or_default().push(role_id);
        }
        for principal in &mut principals {
            principal.role_ids = by_principal.remove(&principal.id).unwrap_or_default();
        }
        Ok(principals)
    }

    /// Create a new principal.
    pub async fn create(&self, data: &CreatePrincipal) -> AppResult<Principal> {
        sqlx::query_as::<_, Principal>(
            "INSERT INTO principals (tenant_id, username, password_hash, is_super) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.tenant_id)
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(data.is_super)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return AppError::conflict(format!(
                        "Username '{}' already exists",
                        data.username
                    ));
                }
                if db_err.is_check_violation() {
                    return AppError::validation("A non-super principal requires a tenant");
                }
            }
            AppError::with_source(ErrorKind::Database, "Failed to create principal", e)
        })
    }

    /// Activate or deactivate a principal.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE principals SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update principal", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Principal {id} not found")));
        }
        Ok(())
    }

    async fn with_roles(&self, principal: Option<Principal>) -> AppResult<Option<Principal>> {
        let Some(mut principal) = principal else {
            return Ok(None);
        };

        principal.role_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT role_id FROM principal_roles WHERE principal_id = $1",
        )
        .bind(principal.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role assignments", e)
        })?;

        Ok(Some(principal))
    }
}
