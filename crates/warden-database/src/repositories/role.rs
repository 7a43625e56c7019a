//! Role and grant repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_entity::role::Role;

/// Roles joined with their direct grants, aggregated per role.
const SELECT_ROLES_WITH_GRANTS: &str = "\
    SELECT r.id, r.name, r.parent_role_id, r.created_at, \
           COALESCE(array_agg(rp.permission_code) \
                    FILTER (WHERE rp.permission_code IS NOT NULL), '{}') AS permissions \
    FROM roles r \
    LEFT JOIN role_permissions rp ON rp.role_id = r.id";

/// Repository for roles, permission grants and role assignments.
///
/// The recursive queries use `UNION` rather than `UNION ALL`, so a cycle in
/// `parent_role_id` stops once no new row is produced.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the given roles with their direct grants. Unknown ids are
    /// skipped.
    pub async fn load_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Role>(&format!(
            "{SELECT_ROLES_WITH_GRANTS} WHERE r.id = ANY($1) GROUP BY r.id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load roles", e))
    }

    /// Find a role by its unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>(&format!(
            "{SELECT_ROLES_WITH_GRANTS} WHERE r.name = $1 GROUP BY r.id"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role", e))
    }

    /// Create a role without grants.
    pub async fn create(&self, name: &str, parent_role_id: Option<Uuid>) -> AppResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, parent_role_id) VALUES ($1, $2) \
             RETURNING id, name, parent_role_id, created_at, '{}'::text[] AS permissions",
        )
        .bind(name)
        .bind(parent_role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return AppError::conflict(format!("Role '{name}' already exists"));
                }
            }
            AppError::with_source(ErrorKind::Database, "Failed to create role", e)
        })
    }

    /// Uncached check: does any role reachable from the principal's
    /// assignments grant `code`?
    pub async fn has_permission_direct(&self, principal_id: Uuid, code: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "WITH RECURSIVE chain(id) AS ( \
                SELECT role_id FROM principal_roles WHERE principal_id = $1 \
                UNION \
                SELECT r.parent_role_id FROM roles r \
                INNER JOIN chain c ON r.id = c.id \
                WHERE r.parent_role_id IS NOT NULL \
             ) \
             SELECT EXISTS ( \
                SELECT 1 FROM role_permissions rp \
                INNER JOIN chain c ON rp.role_id = c.id \
                WHERE rp.permission_code = $2 \
             )",
        )
        .bind(principal_id)
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check permission directly", e)
        })
    }

    /// Principals assigned to `role_id` or to any role that inherits from
    /// it.
    pub async fn principals_inheriting_role(&self, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "WITH RECURSIVE descendants(id) AS ( \
                SELECT $1::uuid \
                UNION \
                SELECT r.id FROM roles r \
                INNER JOIN descendants d ON r.parent_role_id = d.id \
             ) \
             SELECT DISTINCT pr.principal_id FROM principal_roles pr \
             INNER JOIN descendants d ON pr.role_id = d.id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find affected principals", e)
        })
    }

    /// Grant `code` to a role. Granting twice is a no-op.
    pub async fn add_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_code) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add grant", e))?;
        Ok(())
    }

    /// Remove a grant from a role.
    pub async fn remove_grant(&self, role_id: Uuid, code: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_code = $2")
            .bind(role_id)
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to remove grant", e))?;
        Ok(())
    }

    /// Re-parent a role. Cycles are accepted; readers tolerate them.
    pub async fn set_parent(&self, role_id: Uuid, parent_role_id: Option<Uuid>) -> AppResult<()> {
        let result = sqlx::query("UPDATE roles SET parent_role_id = $2 WHERE id = $1")
            .bind(role_id)
            .bind(parent_role_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update role parent", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Role {role_id} not found")));
        }
        Ok(())
    }

    /// Assign a role to a principal. Assigning twice is a no-op.
    pub async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO principal_roles (principal_id, role_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(principal_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to assign role", e))?;
        Ok(())
    }

    /// Remove a role assignment.
    pub async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM principal_roles WHERE principal_id = $1 AND role_id = $2")
            .bind(principal_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unassign role", e))?;
        Ok(())
    }
}
