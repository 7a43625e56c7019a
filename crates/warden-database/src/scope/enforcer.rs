//! Tenant scope enforcement.

use tracing::{debug, error, warn};

use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::{ScopeValue, TenantScoped};
use warden_entity::tenant::TenantContext;

use super::query::{Predicate, ScopeMode, ScopedQuery, SelectQuery};

/// Turns [`SelectQuery`] values into executable [`ScopedQuery`] values for
/// the tenant of the current request.
///
/// Fails closed: a tenant-scoped read with no tenant, by anyone other than
/// a super principal, is an [`InvalidState`](warden_core::ErrorKind::InvalidState)
/// error and never an unfiltered read.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantScopeEnforcer {
    context: Option<TenantContext>,
}

impl TenantScopeEnforcer {
    /// Enforcer bound to a request's tenant context.
    pub fn from_context(context: TenantContext) -> Self {
        Self {
            context: Some(context),
        }
    }

    /// Enforcer with no request context (background work, startup).
    ///
    /// Only global entities and explicitly unscoped queries pass.
    pub fn without_context() -> Self {
        Self { context: None }
    }

    /// The bound context, if any.
    pub fn context(&self) -> Option<&TenantContext> {
        self.context.as_ref()
    }

    /// Scopes `query` to the bound tenant.
    pub fn apply<E: TenantScoped>(&self, mut query: SelectQuery<E>) -> AppResult<ScopedQuery<E>> {
        let principal_id = self.context.and_then(|c| c.principal_id);

        if let Some(reason) = query.unscoped_reason() {
            warn!(
                table = E::TABLE,
                principal_id = ?principal_id,
                reason,
                "Executing query without tenant scope"
            );
            return Ok(ScopedQuery::new(query, ScopeMode::Unscoped));
        }

        let Some(column) = E::TENANT_COLUMN else {
            return Ok(ScopedQuery::new(query, ScopeMode::Global));
        };

        let Some(context) = self.context else {
            error!(
                table = E::TABLE,
                "Tenant-scoped query issued without a tenant context"
            );
            return Err(AppError::invalid_state(format!(
                "Query on '{}' requires a tenant context",
                E::TABLE
            )));
        };

        match context.tenant_id {
            Some(tenant_id) => {
                let expected = ScopeValue::Uuid(tenant_id);
                let mut already_scoped = false;

                for predicate in query.predicates() {
                    if let Predicate::Eq { column: c, value } = predicate {
                        if *c != column {
                            continue;
                        }
                        if *value == expected {
                            already_scoped = true;
                        } else {
                            warn!(
                                table = E::TABLE,
                                tenant_id = %tenant_id,
                                principal_id = ?principal_id,
                                "Query filters on a foreign tenant"
                            );
                            return Err(AppError::forbidden(format!(
                                "Query on '{}' targets another tenant",
                                E::TABLE
                            )));
                        }
                    }
                }

                if !already_scoped {
                    query.push_predicate(Predicate::Eq {
                        column,
                        value: expected,
                    });
                }
                debug!(table = E::TABLE, tenant_id = %tenant_id, "Tenant scope applied");
                Ok(ScopedQuery::new(query, ScopeMode::Tenant(tenant_id)))
            }
            None if context.is_super => {
                debug!(
                    table = E::TABLE,
                    principal_id = ?principal_id,
                    "Super principal query across tenants"
                );
                Ok(ScopedQuery::new(query, ScopeMode::CrossTenant))
            }
            None => {
                error!(
                    table = E::TABLE,
                    principal_id = ?principal_id,
                    "Non-super principal has no tenant"
                );
                Err(AppError::invalid_state(format!(
                    "Principal without tenant issued a query on '{}'",
                    E::TABLE
                )))
            }
        }
    }
}

/// Scopes `query` to `context`; shorthand for
/// `TenantScopeEnforcer::from_context(*context).apply(query)`.
pub fn with_tenant_scope<E: TenantScoped>(
    query: SelectQuery<E>,
    context: &TenantContext,
) -> AppResult<ScopedQuery<E>> {
    TenantScopeEnforcer::from_context(*context).apply(query)
}
