//! Query values before and after tenant scoping.

use std::fmt;
use std::marker::PhantomData;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::{ScopeValue, TenantScoped};

/// A single conjunctive filter.
///
/// Column names are `&'static str` so that only compile-time identifiers can
/// end up in SQL text; values are always bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = value` (`column IS NULL` for [`ScopeValue::Null`]).
    Eq {
        /// Column name.
        column: &'static str,
        /// Expected value.
        value: ScopeValue,
    },
    /// `column IN (values)`; an empty list matches nothing.
    In {
        /// Column name.
        column: &'static str,
        /// Accepted values.
        values: Vec<ScopeValue>,
    },
}

impl Predicate {
    /// The column this predicate constrains.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => *column,
        }
    }

    fn matches<E: TenantScoped>(&self, row: &E) -> bool {
        match self {
            Self::Eq { column, value } => row.column_value(column).as_ref() == Some(value),
            Self::In { column, values } => row
                .column_value(column)
                .is_some_and(|v| v != ScopeValue::Null && values.contains(&v)),
        }
    }
}

/// An unscoped read against entity `E`. Build it, then hand it to the
/// enforcer.
pub struct SelectQuery<E> {
    predicates: Vec<Predicate>,
    order_by: Option<&'static str>,
    limit: Option<u32>,
    unscoped_reason: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: TenantScoped> SelectQuery<E> {
    /// Selects every row of `E::SOURCE`.
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
            order_by: None,
            limit: None,
            unscoped_reason: None,
            _entity: PhantomData,
        }
    }

    /// Adds `column = value`.
    pub fn filter_eq(mut self, column: &'static str, value: impl Into<ScopeValue>) -> Self {
        self.predicates.push(Predicate::Eq {
            column,
            value: value.into(),
        });
        self
    }

    /// Adds `column IN (values)`.
    pub fn filter_in<V: Into<ScopeValue>>(
        mut self,
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.predicates.push(Predicate::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Orders results by `column` ascending.
    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order_by = Some(column);
        self
    }

    /// Caps the number of rows returned. Unsigned so the in-memory and SQL
    /// paths cannot disagree on a negative cap.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Opts this query out of tenant scoping.
    ///
    /// The reason is logged at `warn` when the query is scoped, so every
    /// cross-tenant read leaves an audit trail.
    pub fn without_tenant_scope(mut self, reason: impl Into<String>) -> Self {
        self.unscoped_reason = Some(reason.into());
        self
    }

    /// The opt-out reason, if the query was explicitly unscoped.
    pub fn unscoped_reason(&self) -> Option<&str> {
        self.unscoped_reason.as_deref()
    }

    /// Current predicates, in insertion order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub(crate) fn push_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }
}

impl<E: TenantScoped> Default for SelectQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for SelectQuery<E> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            order_by: self.order_by,
            limit: self.limit,
            unscoped_reason: self.unscoped_reason.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: TenantScoped> fmt::Debug for SelectQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("table", &E::TABLE)
            .field("predicates", &self.predicates)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("unscoped_reason", &self.unscoped_reason)
            .finish()
    }
}

/// How a [`ScopedQuery`] was scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Restricted to a single tenant.
    Tenant(Uuid),
    /// The entity has no tenant column.
    Global,
    /// A verified super principal without a tenant.
    CrossTenant,
    /// Explicit opt-out at the call site.
    Unscoped,
}

/// A query that has passed through the enforcer and may be executed.
///
/// There is no public constructor.
pub struct ScopedQuery<E> {
    query: SelectQuery<E>,
    mode: ScopeMode,
}

impl<E: TenantScoped> ScopedQuery<E> {
    pub(crate) fn new(query: SelectQuery<E>, mode: ScopeMode) -> Self {
        Self { query, mode }
    }

    /// How this query was scoped.
    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    /// Final predicates, including the injected tenant predicate.
    pub fn predicates(&self) -> &[Predicate] {
        self.query.predicates()
    }

    /// Returns the underlying query, e.g. to scope it again.
    pub fn into_query(self) -> SelectQuery<E> {
        self.query
    }

    /// Evaluates the predicates against an already-loaded row.
    pub fn matches(&self, row: &E) -> bool {
        self.query.predicates.iter().all(|p| p.matches(row))
    }

    /// Applies the query (predicates, order, limit) to in-memory rows.
    pub fn filter_rows(&self, rows: impl IntoIterator<Item = E>) -> Vec<E> {
        let mut out: Vec<E> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if let Some(column) = self.query.order_by {
            out.sort_by_cached_key(|r| sort_key(r.column_value(column)));
        }
        if let Some(limit) = self.query.limit {
            out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        out
    }

    /// Renders the query as parameterised SQL.
    pub fn to_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {}", E::SOURCE));

        for (i, predicate) in self.query.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match predicate {
                Predicate::Eq {
                    column,
                    value: ScopeValue::Null,
                } => {
                    qb.push(*column).push(" IS NULL");
                }
                Predicate::Eq { column, value } => {
                    qb.push(*column).push(" = ");
                    push_value(&mut qb, value);
                }
                Predicate::In { values, .. } if values.is_empty() => {
                    qb.push("FALSE");
                }
                Predicate::In { column, values } => {
                    qb.push(*column).push(" IN (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            qb.push(", ");
                        }
                        push_value(&mut qb, value);
                    }
                    qb.push(")");
                }
            }
        }

        if let Some(column) = self.query.order_by {
            qb.push(" ORDER BY ").push(column);
        }
        if let Some(limit) = self.query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }
        qb
    }

    /// Executes the query and returns every matching row.
    pub async fn fetch_all(self, pool: &PgPool) -> AppResult<Vec<E>>
    where
        E: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut qb = self.to_builder();
        qb.build_query_as::<E>()
            .fetch_all(pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to query {}", E::TABLE),
                    e,
                )
            })
    }

    /// Executes the query and returns at most one row.
    pub async fn fetch_optional(self, pool: &PgPool) -> AppResult<Option<E>>
    where
        E: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut qb = self.to_builder();
        qb.build_query_as::<E>()
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to query {}", E::TABLE),
                    e,
                )
            })
    }
}

impl<E: TenantScoped> fmt::Debug for ScopedQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedQuery")
            .field("mode", &self.mode)
            .field("query", &self.query)
            .finish()
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &ScopeValue) {
    match value {
        ScopeValue::Uuid(v) => qb.push_bind(*v),
        ScopeValue::Text(v) => qb.push_bind(v.clone()),
        ScopeValue::Int(v) => qb.push_bind(*v),
        ScopeValue::Bool(v) => qb.push_bind(*v),
        ScopeValue::Null => qb.push("NULL"),
    };
}

/// Orderable projection of a column value; `NULL` sorts last like Postgres.
fn sort_key(value: Option<ScopeValue>) -> (u8, String) {
    match value {
        Some(ScopeValue::Uuid(v)) => (0, v.to_string()),
        Some(ScopeValue::Text(v)) => (0, v),
        Some(ScopeValue::Int(v)) => (0, format!("{:020}", v as i128 - i64::MIN as i128)),
        Some(ScopeValue::Bool(v)) => (0, u8::from(v).to_string()),
        Some(ScopeValue::Null) | None => (1, String::new()),
    }
}
