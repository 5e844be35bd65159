//! Data store subsystem.
//!
//! # Data Flow
//! ```text
//! handler / service
//!     → DataStore trait (table ops + user provisioning)
//!         → rest.rs   (PostgREST + GoTrue admin API over reqwest)
//!         → memory.rs (in-process tables, tests and local runs)
//! ```
//!
//! # Design Decisions
//! - Rows travel as `serde_json::Value`; services own their typed views
//! - Writes return the affected rows so callers can detect "no match"
//!   (used by the abuse tracker's compare-and-swap)
//! - Both backend projects get their own handle; nothing is global

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Errors surfaced by a data store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("duplicate key in {table}")]
    Conflict { table: String },
    #[error("no row in {table} matched")]
    NoMatch { table: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A column filter. Only equality is needed by this service.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    /// Whether a row satisfies this filter. `null` matches only missing or null columns.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, expected) => {
                let actual = row.get(column).unwrap_or(&Value::Null);
                actual == expected
            }
        }
    }
}

/// A read against one table.
#[derive(Debug, Clone)]
pub struct Query {
    pub table: String,
    /// Column list in PostgREST syntax, `*` for all columns.
    pub columns: String,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// What an insert does when a row with the same key already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnConflict {
    /// Reject with [`StoreError::Conflict`].
    Fail,
    /// Keep the existing row; the insert returns no rows.
    Ignore(Vec<String>),
    /// Overwrite the existing row (upsert, last writer wins).
    Merge(Vec<String>),
}

/// Input for creating an authentication account.
#[derive(Clone)]
pub struct NewAuthUser {
    pub email: String,
    pub password: String,
    /// Mark the email as confirmed without sending a confirmation mail.
    pub email_confirm: bool,
    pub user_metadata: Value,
}

impl std::fmt::Debug for NewAuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAuthUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("email_confirm", &self.email_confirm)
            .finish()
    }
}

/// An authentication account as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Table-level access to one backend project.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Read rows matching the query.
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>>;

    /// Insert one row, returning the rows actually written.
    async fn insert(&self, table: &str, row: Value, on_conflict: OnConflict) -> StoreResult<Vec<Value>>;

    /// Patch every row matching all filters, returning the updated rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<Vec<Value>>;

    /// Delete every row matching all filters, returning the deleted rows.
    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Value>>;

    /// Create an authentication account.
    async fn create_user(&self, user: NewAuthUser) -> StoreResult<AuthUser>;

    /// Convenience: first row matching the query, if any.
    async fn select_one(&self, query: &Query) -> StoreResult<Option<Value>> {
        let query = query.clone().limit(1);
        Ok(self.select(&query).await?.into_iter().next())
    }
}

/// Handles to both backend projects.
#[derive(Clone)]
pub struct Stores {
    /// Referral programme project.
    pub nio_afiliados: Arc<dyn DataStore>,
    /// URA dashboard project.
    pub painel_ura: Arc<dyn DataStore>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches() {
        let row = json!({"id": "a", "count": 3, "blocked": null});
        assert!(Filter::eq("id", "a").matches(&row));
        assert!(Filter::eq("count", 3).matches(&row));
        assert!(Filter::eq("blocked", Value::Null).matches(&row));
        assert!(Filter::eq("missing", Value::Null).matches(&row));
        assert!(!Filter::eq("count", 4).matches(&row));
    }

    #[test]
    fn test_query_builder() {
        let q = Query::table("profiles").select("id, email").filter(Filter::eq("id", "x")).limit(10);
        assert_eq!(q.table, "profiles");
        assert_eq!(q.columns, "id, email");
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.limit, Some(10));
    }
}
