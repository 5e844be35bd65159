//! Administrative account provisioning.
//!
//! # Data Flow
//! ```text
//! POST /admin/create-user
//!     → auth.rs        (Bearer admin key, 401 otherwise)
//!     → handlers.rs    (body → NewAccount)
//!     → provisioner.rs (auth account, then role override)
//! ```

pub mod auth;
pub mod handlers;
pub mod provisioner;

use axum::{middleware, routing::post, Router};

use crate::http::AppState;

pub use provisioner::{NewAccount, ProvisionError, Role, UserProvisioner};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/create-user", post(handlers::create_user))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin_key))
}
