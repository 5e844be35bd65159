//! Fan-out of one notification to every subscription of a user.

use std::sync::Arc;

use serde_json::Value;

use crate::config::PushConfig;
use crate::observability::metrics;
use crate::push::{NotificationPayload, PushGateway, PushSubscription};
use crate::store::{DataStore, Filter, Query, StoreError};

pub const SUBSCRIPTIONS_TABLE: &str = "push_subscriptions";

/// Counts for one dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Subscriptions deleted because the provider reported them gone.
    pub pruned: usize,
}

#[derive(Clone)]
pub struct PushDispatcher {
    store: Arc<dyn DataStore>,
    gateway: Arc<dyn PushGateway>,
    icon: String,
    badge: String,
}

impl PushDispatcher {
    pub fn new(store: Arc<dyn DataStore>, gateway: Arc<dyn PushGateway>, config: &PushConfig) -> Self {
        Self {
            store,
            gateway,
            icon: config.icon.clone(),
            badge: config.badge.clone(),
        }
    }

    pub fn payload(&self, title: &str, body: &str, data: Option<Value>) -> NotificationPayload {
        NotificationPayload {
            title: title.to_string(),
            body: body.to_string(),
            icon: self.icon.clone(),
            badge: self.badge.clone(),
            data,
        }
    }

    /// Deliver to every stored subscription of `user_id`, sequentially.
    ///
    /// Only the initial subscription lookup can fail the whole batch.
    pub async fn dispatch(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: Option<Value>,
    ) -> Result<DispatchReport, StoreError> {
        let query = Query::table(SUBSCRIPTIONS_TABLE)
            .select("id, subscription")
            .filter(Filter::eq("user_id", user_id));
        let rows = self.store.select(&query).await?;

        let mut report = DispatchReport::default();
        if rows.is_empty() {
            tracing::info!(user_id, "No push subscriptions for user");
            return Ok(report);
        }

        let payload = serde_json::to_vec(&self.payload(title, body, data))
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        for row in rows {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            let subscription = match row
                .get("subscription")
                .cloned()
                .map(serde_json::from_value::<PushSubscription>)
            {
                Some(Ok(subscription)) => subscription,
                Some(Err(e)) => {
                    tracing::warn!(subscription_id = %id, error = %e, "Malformed push subscription");
                    metrics::record_push_delivery("malformed");
                    report.failed += 1;
                    continue;
                }
                None => {
                    tracing::warn!(subscription_id = %id, "Push subscription row has no subscription");
                    metrics::record_push_delivery("malformed");
                    report.failed += 1;
                    continue;
                }
            };

            match self.gateway.send(&subscription, &payload).await {
                Ok(()) => {
                    tracing::debug!(subscription_id = %id, "Push delivered");
                    metrics::record_push_delivery("sent");
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(subscription_id = %id, status = ?e.status(), error = %e, "Push delivery failed");
                    metrics::record_push_delivery("failed");
                    report.failed += 1;
                    if e.is_gone() && self.prune(&id).await {
                        report.pruned += 1;
                    }
                }
            }
        }

        tracing::info!(user_id, sent = report.sent, failed = report.failed, pruned = report.pruned, "Push batch finished");
        Ok(report)
    }

    async fn prune(&self, id: &Value) -> bool {
        if id.is_null() {
            return false;
        }
        match self.store.delete(SUBSCRIPTIONS_TABLE, &[Filter::Eq("id".to_string(), id.clone())]).await {
            Ok(_) => {
                tracing::info!(subscription_id = %id, "Removed expired push subscription");
                true
            }
            Err(e) => {
                tracing::error!(subscription_id = %id, error = %e, "Failed to remove expired push subscription");
                false
            }
        }
    }
}
