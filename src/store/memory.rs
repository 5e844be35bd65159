//! In-process data store.
//!
//! Tables are vectors of JSON rows behind a [`DashMap`] shard lock, so every
//! single operation on a table is atomic. Account creation mirrors the
//! production trigger: a `profiles` row and a `user_roles` row with the
//! default role are written next to the auth user.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::store::{AuthUser, DataStore, Filter, NewAuthUser, OnConflict, Query, StoreError, StoreResult};

const AUTH_USERS: &str = "auth.users";

/// Role the store assigns to every new account.
pub const DEFAULT_ROLE: &str = "indicador";

#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Value>>,
    failing: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table without any conflict handling.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.get(table).map(|rows| rows.clone()).unwrap_or_default()
    }

    /// Make every subsequent operation on `table` fail with a 500.
    pub fn fail_table(&self, table: &str) {
        self.failing.insert(table.to_string());
    }

    fn check_available(&self, table: &str) -> StoreResult<()> {
        if self.failing.contains(table) {
            return Err(StoreError::Status {
                status: 500,
                body: format!("table {table} unavailable"),
            });
        }
        Ok(())
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

fn same_key(existing: &Value, row: &Value, columns: &[String]) -> bool {
    !columns.is_empty()
        && columns
            .iter()
            .all(|c| existing.get(c).unwrap_or(&Value::Null) == row.get(c).unwrap_or(&Value::Null))
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let mut out = serde_json::Map::new();
    for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(value) = row.get(column) {
            out.insert(column.to_string(), value.clone());
        }
    }
    Value::Object(out)
}

fn merge_into(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        self.check_available(&query.table)?;
        let Some(rows) = self.tables.get(&query.table) else {
            return Ok(Vec::new());
        };
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .iter()
            .filter(|row| matches_all(row, &query.filters))
            .take(limit)
            .map(|row| project(row, &query.columns))
            .collect())
    }

    async fn insert(&self, table: &str, row: Value, on_conflict: OnConflict) -> StoreResult<Vec<Value>> {
        self.check_available(table)?;
        let mut rows = self.tables.entry(table.to_string()).or_default();

        let key: Vec<String> = match &on_conflict {
            OnConflict::Fail => vec!["id".to_string()],
            OnConflict::Ignore(columns) | OnConflict::Merge(columns) => columns.clone(),
        };
        let keyed = key.iter().all(|c| row.get(c).is_some());
        let existing = rows.iter().position(|r| keyed && same_key(r, &row, &key));

        match (existing, on_conflict) {
            (None, _) => {
                rows.push(row.clone());
                Ok(vec![row])
            }
            (Some(_), OnConflict::Fail) => Err(StoreError::Conflict { table: table.to_string() }),
            (Some(_), OnConflict::Ignore(_)) => Ok(Vec::new()),
            (Some(idx), OnConflict::Merge(_)) => {
                merge_into(&mut rows[idx], &row);
                Ok(vec![rows[idx].clone()])
            }
        }
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<Vec<Value>> {
        self.check_available(table)?;
        let Some(mut rows) = self.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_all(row, filters)) {
            merge_into(row, &patch);
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        self.check_available(table)?;
        let Some(mut rows) = self.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let (deleted, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|row| matches_all(row, filters));
        *rows = kept;
        Ok(deleted)
    }

    async fn create_user(&self, user: NewAuthUser) -> StoreResult<AuthUser> {
        self.check_available(AUTH_USERS)?;
        let id = Uuid::new_v4().to_string();
        {
            let mut users = self.tables.entry(AUTH_USERS.to_string()).or_default();
            if users.iter().any(|u| u["email"] == json!(user.email)) {
                return Err(StoreError::Status {
                    status: 422,
                    body: "A user with this email address has already been registered".to_string(),
                });
            }
            users.push(json!({
                "id": id,
                "email": user.email,
                "email_confirmed": user.email_confirm,
                "user_metadata": user.user_metadata,
            }));
        }

        self.seed(
            "profiles",
            [json!({
                "id": id,
                "full_name": user.user_metadata.get("full_name").cloned().unwrap_or(Value::Null),
                "email": user.email,
            })],
        );
        self.seed("user_roles", [json!({ "user_id": id, "role": DEFAULT_ROLE })]);

        Ok(AuthUser { id, email: user.email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_ignore_and_merge() {
        let store = MemoryStore::new();
        let key = vec!["identifier".to_string(), "action_type".to_string()];
        let row = json!({"identifier": "a@x", "action_type": "signup", "attempt_count": 1});

        let written = store.insert("abuse_tracking", row.clone(), OnConflict::Ignore(key.clone())).await.unwrap();
        assert_eq!(written.len(), 1);

        let again = store.insert("abuse_tracking", row, OnConflict::Ignore(key.clone())).await.unwrap();
        assert!(again.is_empty());

        let merged = store
            .insert(
                "abuse_tracking",
                json!({"identifier": "a@x", "action_type": "signup", "attempt_count": 2}),
                OnConflict::Merge(key),
            )
            .await
            .unwrap();
        assert_eq!(merged[0]["attempt_count"], 2);
        assert_eq!(store.rows("abuse_tracking").len(), 1);
    }

    #[tokio::test]
    async fn test_conditional_update_only_hits_matching_rows() {
        let store = MemoryStore::new();
        store.seed("t", [json!({"id": 1, "n": 1}), json!({"id": 2, "n": 1})]);

        let updated = store
            .update("t", &[Filter::eq("id", 1), Filter::eq("n", 5)], json!({"n": 6}))
            .await
            .unwrap();
        assert!(updated.is_empty());

        let updated = store
            .update("t", &[Filter::eq("id", 1), Filter::eq("n", 1)], json!({"n": 2}))
            .await
            .unwrap();
        assert_eq!(updated, vec![json!({"id": 1, "n": 2})]);
    }

    #[tokio::test]
    async fn test_select_projects_and_limits() {
        let store = MemoryStore::new();
        store.seed("profiles", (0..20).map(|i| json!({"id": i, "full_name": "x", "secret": true})));
        let rows = store
            .select(&Query::table("profiles").select("id, full_name").limit(10))
            .await
            .unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows[0].get("secret").is_none());
    }

    #[tokio::test]
    async fn test_delete_and_failure_injection() {
        let store = MemoryStore::new();
        store.seed("push_subscriptions", [json!({"id": "s1"}), json!({"id": "s2"})]);
        let deleted = store.delete("push_subscriptions", &[Filter::eq("id", "s1")]).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(store.rows("push_subscriptions"), vec![json!({"id": "s2"})]);

        store.fail_table("push_subscriptions");
        assert!(store.delete("push_subscriptions", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_create_user_assigns_default_role() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewAuthUser {
                email: "ana@example.com".into(),
                password: "s3cret".into(),
                email_confirm: false,
                user_metadata: json!({"full_name": "Ana"}),
            })
            .await
            .unwrap();

        let roles = store.rows("user_roles");
        assert_eq!(roles, vec![json!({"user_id": user.id, "role": DEFAULT_ROLE})]);

        let dup = store
            .create_user(NewAuthUser {
                email: "ana@example.com".into(),
                password: "other".into(),
                email_confirm: false,
                user_metadata: json!({}),
            })
            .await;
        assert!(matches!(dup, Err(StoreError::Status { status: 422, .. })));
    }
}
