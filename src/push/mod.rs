//! Push notification subsystem.
//!
//! # Data Flow
//! ```text
//! POST /push/send-notification {user_id, title, body, data?}
//!     → dispatcher.rs (load push_subscriptions for user_id)
//!     → gateway.rs    (encrypt + VAPID sign + POST, one subscription at a time)
//!     → on 404/410: delete subscription row
//!     → {success, sent, failed}
//! ```

pub mod dispatcher;
pub mod gateway;
pub mod handlers;

use axum::{routing::post, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::AppState;

pub use dispatcher::{DispatchReport, PushDispatcher, SUBSCRIPTIONS_TABLE};
pub use gateway::{PushError, PushGateway, WebPushGateway};

pub fn router() -> Router<AppState> {
    Router::new().route("/send-notification", post(handlers::send_notification))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Browser push registration as stored in the `subscription` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// JSON document delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
