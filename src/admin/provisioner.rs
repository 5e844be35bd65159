//! Account provisioning.
//!
//! # Responsibilities
//! - Create an unconfirmed auth account carrying the signup metadata
//! - Override the default role when another allowed role is requested
//!
//! # Design Decisions
//! - The store assigns the default role on account creation; only other
//!   roles need a follow-up write
//! - The two writes are not transactional: a failed role write is
//!   reported with the new `user_id` and nothing is rolled back

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::store::{DataStore, Filter, NewAuthUser, StoreError};

pub const USER_ROLES_TABLE: &str = "user_roles";

/// Roles an account may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Vendedor,
    Backoffice,
    Financeiro,
    #[default]
    Indicador,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendedor => "vendedor",
            Role::Backoffice => "backoffice",
            Role::Financeiro => "financeiro",
            Role::Indicador => "indicador",
        }
    }

    /// Exact match against the allowed set; anything else is the default role.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("admin") => Role::Admin,
            Some("vendedor") => Role::Vendedor,
            Some("backoffice") => Role::Backoffice,
            Some("financeiro") => Role::Financeiro,
            _ => Role::Indicador,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for [`UserProvisioner::create_user`].
#[derive(Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub whatsapp: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub role: Option<String>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedUser {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("failed to create auth user: {0}")]
    AuthCreate(#[source] StoreError),
    #[error("user {user_id} created but role assignment failed: {source}")]
    RoleAssignment {
        user_id: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Clone)]
pub struct UserProvisioner {
    store: Arc<dyn DataStore>,
}

impl UserProvisioner {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(&self, account: NewAccount) -> Result<ProvisionedUser, ProvisionError> {
        if account.email.trim().is_empty() || account.password.is_empty() {
            return Err(ProvisionError::MissingCredentials);
        }

        let role = Role::parse_or_default(account.role.as_deref());
        if account.role.as_deref().is_some_and(|raw| raw != role.as_str()) {
            tracing::warn!(requested = ?account.role, "Unknown role requested, using default");
        }

        let user = self
            .store
            .create_user(NewAuthUser {
                email: account.email,
                password: account.password,
                email_confirm: false,
                user_metadata: json!({
                    "full_name": account.full_name,
                    "whatsapp": account.whatsapp,
                    "city": account.city,
                    "state": account.state,
                }),
            })
            .await
            .map_err(ProvisionError::AuthCreate)?;

        tracing::info!(user_id = %user.id, "Auth user created");

        if role != Role::default() {
            let updated = self
                .store
                .update(
                    USER_ROLES_TABLE,
                    &[Filter::eq("user_id", user.id.as_str())],
                    json!({ "role": role.as_str() }),
                )
                .await
                .map_err(|source| ProvisionError::RoleAssignment {
                    user_id: user.id.clone(),
                    source,
                })?;
            // The default role row comes from the signup trigger; without it nothing was written.
            if updated.is_empty() {
                return Err(ProvisionError::RoleAssignment {
                    user_id: user.id,
                    source: StoreError::NoMatch { table: USER_ROLES_TABLE.to_string() },
                });
            }
            tracing::info!(user_id = %user.id, %role, "Role assigned");
        }

        Ok(ProvisionedUser { user_id: user.id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AuthUser, MemoryStore, OnConflict, Query, StoreResult};
    use async_trait::async_trait;
    use serde_json::Value;

    /// Creates accounts without the default `user_roles` row.
    struct NoRoleRowStore(MemoryStore);

    #[async_trait]
    impl DataStore for NoRoleRowStore {
        async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
            self.0.select(query).await
        }

        async fn insert(&self, table: &str, row: Value, on_conflict: OnConflict) -> StoreResult<Vec<Value>> {
            self.0.insert(table, row, on_conflict).await
        }

        async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> StoreResult<Vec<Value>> {
            self.0.update(table, filters, patch).await
        }

        async fn delete(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Value>> {
            self.0.delete(table, filters).await
        }

        async fn create_user(&self, user: NewAuthUser) -> StoreResult<AuthUser> {
            let created = self.0.create_user(user).await?;
            self.0
                .delete(USER_ROLES_TABLE, &[Filter::eq("user_id", created.id.as_str())])
                .await?;
            Ok(created)
        }
    }

    fn account(role: Option<&str>) -> NewAccount {
        NewAccount {
            email: "ana@example.com".into(),
            password: "s3cret!".into(),
            full_name: Some("Ana Souza".into()),
            whatsapp: Some("+5511999990000".into()),
            role: role.map(str::to_string),
            ..Default::default()
        }
    }

    fn role_of(store: &MemoryStore, user_id: &str) -> String {
        store
            .rows(USER_ROLES_TABLE)
            .into_iter()
            .find(|r| r["user_id"] == user_id)
            .and_then(|r| r["role"].as_str().map(str::to_string))
            .unwrap()
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse_or_default(Some("admin")), Role::Admin);
        assert_eq!(Role::parse_or_default(Some("financeiro")), Role::Financeiro);
        assert_eq!(Role::parse_or_default(Some("superadmin")), Role::Indicador);
        assert_eq!(Role::parse_or_default(Some("Admin")), Role::Indicador);
        assert_eq!(Role::parse_or_default(None), Role::Indicador);
    }

    #[tokio::test]
    async fn test_unknown_role_falls_back_to_default() {
        let store = Arc::new(MemoryStore::new());
        let provisioner = UserProvisioner::new(store.clone());

        let user = provisioner.create_user(account(Some("superadmin"))).await.unwrap();

        assert_eq!(user.role, Role::Indicador);
        assert_eq!(role_of(&store, &user.user_id), "indicador");
    }

    #[tokio::test]
    async fn test_non_default_role_is_written() {
        let store = Arc::new(MemoryStore::new());
        let provisioner = UserProvisioner::new(store.clone());

        let user = provisioner.create_user(account(Some("backoffice"))).await.unwrap();

        assert_eq!(user.role, Role::Backoffice);
        assert_eq!(role_of(&store, &user.user_id), "backoffice");
        let auth = store.rows("auth.users");
        assert_eq!(auth[0]["email_confirmed"], false);
        assert_eq!(auth[0]["user_metadata"]["full_name"], "Ana Souza");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let provisioner = UserProvisioner::new(Arc::new(MemoryStore::new()));
        let mut input = account(None);
        input.password.clear();
        assert!(matches!(
            provisioner.create_user(input).await,
            Err(ProvisionError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_role_failure_keeps_account() {
        let store = Arc::new(MemoryStore::new());
        let provisioner = UserProvisioner::new(store.clone());
        // Account creation seeds user_roles directly; only the update sees the failure.
        let first = provisioner.create_user(account(None)).await.unwrap();
        store.fail_table(USER_ROLES_TABLE);

        let mut second = account(Some("admin"));
        second.email = "bia@example.com".into();
        let err = provisioner.create_user(second).await.unwrap_err();

        match err {
            ProvisionError::RoleAssignment { user_id, .. } => {
                assert_ne!(user_id, first.user_id);
                assert!(store.rows("auth.users").iter().any(|u| u["id"] == user_id.as_str()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_role_row_is_role_failure() {
        let store = Arc::new(NoRoleRowStore(MemoryStore::new()));
        let provisioner = UserProvisioner::new(store.clone());

        let err = provisioner.create_user(account(Some("vendedor"))).await.unwrap_err();

        match err {
            ProvisionError::RoleAssignment { user_id, source: StoreError::NoMatch { table } } => {
                assert_eq!(table, USER_ROLES_TABLE);
                assert!(store.0.rows("auth.users").iter().any(|u| u["id"] == user_id.as_str()));
                assert!(store.0.rows(USER_ROLES_TABLE).is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_role_row_is_fine_for_default_role() {
        let provisioner = UserProvisioner::new(Arc::new(NoRoleRowStore(MemoryStore::new())));
        let user = provisioner.create_user(account(None)).await.unwrap();
        assert_eq!(user.role, Role::Indicador);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_auth_error() {
        let provisioner = UserProvisioner::new(Arc::new(MemoryStore::new()));
        provisioner.create_user(account(None)).await.unwrap();
        assert!(matches!(
            provisioner.create_user(account(None)).await,
            Err(ProvisionError::AuthCreate(_))
        ));
    }
}
