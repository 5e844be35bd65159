//! REST client for a hosted backend project.
//!
//! # Responsibilities
//! - Table operations through the PostgREST interface (`/rest/v1/{table}`)
//! - Account creation through the auth admin API (`/auth/v1/admin/users`)
//! - Authenticate every call with the project's service role key
//!
//! # Design Decisions
//! - Writes ask for `return=representation` so callers see affected rows
//! - Non-2xx responses keep status and body for logging; nothing is retried here
//! - Timeouts come from the shared `reqwest::Client`

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{json, Value};

use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::store::{AuthUser, DataStore, Filter, NewAuthUser, OnConflict, Query, StoreError, StoreResult};

/// Store backed by a PostgREST + GoTrue deployment.
#[derive(Clone)]
pub struct RestStore {
    name: &'static str,
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(name: &'static str, config: &StoreConfig, client: reqwest::Client) -> Self {
        Self {
            name,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_role_key.clone(),
            client,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("rest/v1/{table}"))
    }

    async fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        match builder.send().await {
            Ok(response) => {
                metrics::record_upstream_call(self.name, response.status().is_success());
                Ok(response)
            }
            Err(e) => {
                metrics::record_upstream_call(self.name, false);
                tracing::warn!(store = self.name, error = %e, "Store request failed");
                Err(e.into())
            }
        }
    }

    async fn rows(&self, table: &str, response: Response) -> StoreResult<Vec<Value>> {
        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(StoreError::Conflict { table: table.to_string() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(store = self.name, table, status = status.as_u16(), body = %body, "Store rejected request");
            return Err(StoreError::Status { status: status.as_u16(), body });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(row @ Value::Object(_)) => Ok(vec![row]),
            Ok(other) => Err(StoreError::Decode(format!("expected rows, got {other}"))),
            Err(e) => Err(StoreError::Decode(e.to_string())),
        }
    }
}

/// Render filters as PostgREST query parameters.
pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|Filter::Eq(column, value)| {
            let operand = match value {
                Value::Null => "is.null".to_string(),
                Value::String(s) => format!("eq.{s}"),
                other => format!("eq.{other}"),
            };
            (column.clone(), operand)
        })
        .collect()
}

#[async_trait]
impl DataStore for RestStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        let mut params = vec![("select".to_string(), query.columns.replace(' ', ""))];
        params.extend(filter_params(&query.filters));
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let response = self.send(self.table(Method::GET, &query.table).query(&params)).await?;
        self.rows(&query.table, response).await
    }

    async fn insert(&self, table: &str, row: Value, on_conflict: OnConflict) -> StoreResult<Vec<Value>> {
        let mut builder = self.table(Method::POST, table).json(&row);
        builder = match &on_conflict {
            OnConflict::Fail => builder.header("Prefer", "return=representation"),
            OnConflict::Ignore(columns) => builder
                .query(&[("on_conflict", columns.join(","))])
                .header("Prefer", "resolution=ignore-duplicates,return=representation"),
            OnConflict::Merge(columns) => builder
                .query(&[("on_conflict", columns.join(","))])
                .header("Prefer", "resolution=merge-duplicates,return=representation"),
        };

        let response = self.send(builder).await?;
        self.rows(table, response).await
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<Vec<Value>> {
        let builder = self
            .table(Method::PATCH, table)
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(builder).await?;
        self.rows(table, response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let builder = self
            .table(Method::DELETE, table)
            .query(&filter_params(filters))
            .header("Prefer", "return=representation");
        let response = self.send(builder).await?;
        self.rows(table, response).await
    }

    async fn create_user(&self, user: NewAuthUser) -> StoreResult<AuthUser> {
        let body = json!({
            "email": user.email,
            "password": user.password,
            "email_confirm": user.email_confirm,
            "user_metadata": user.user_metadata,
        });
        let response = self
            .send(self.request(Method::POST, "auth/v1/admin/users").json(&body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status: status.as_u16(), body });
        }

        let created: Value = response.json().await?;
        let record = created.get("user").unwrap_or(&created);
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("created user has no id".to_string()))?;

        Ok(AuthUser {
            id: id.to_string(),
            email: record
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or(&user.email)
                .to_string(),
        })
    }
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_params() {
        let params = filter_params(&[
            Filter::eq("identifier", "a@b.com"),
            Filter::eq("attempt_count", 4),
            Filter::eq("blocked_until", Value::Null),
        ]);
        assert_eq!(
            params,
            vec![
                ("identifier".to_string(), "eq.a@b.com".to_string()),
                ("attempt_count".to_string(), "eq.4".to_string()),
                ("blocked_until".to_string(), "is.null".to_string()),
            ]
        );
    }

    #[test]
    fn test_base_url_is_normalized() {
        let store = RestStore::new(
            "nio_afiliados",
            &StoreConfig {
                url: "https://nio.example.co/".into(),
                service_role_key: "k".into(),
            },
            reqwest::Client::new(),
        );
        assert_eq!(store.base_url, "https://nio.example.co");
    }
}
