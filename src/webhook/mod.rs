//! Signup relay to the workflow-automation webhook.
//!
//! # Responsibilities
//! - Validate the signup fields before anything leaves the process
//! - Relay them to the automation endpoint in a detached task
//!
//! # Design Decisions
//! - The caller gets its answer as soon as the payload is valid; the relay
//!   outcome is only visible in logs and metrics
//! - Each relay runs inside its own `webhook_relay` span, which records the
//!   email domain only

pub mod handlers;

use axum::{routing::post, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::schema::WebhookConfig;
use crate::http::request::non_blank;
use crate::http::AppState;
use crate::observability::metrics;

pub fn router() -> Router<AppState> {
    Router::new().route("/send-indicador-to-n8n", post(handlers::send_indicador))
}

/// Fields captured on the public signup form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupLead {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("full_name, email and whatsapp are required")]
    MissingFields,
    #[error("webhook request failed: {0}")]
    Transport(String),
    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Body posted to the automation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayPayload {
    pub full_name: String,
    pub email: String,
    pub whatsapp: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub source: String,
    pub submitted_at: String,
}

/// Domain part of an address, for logs that must not carry the address itself.
fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("")
}

#[derive(Clone)]
pub struct WebhookForwarder {
    client: reqwest::Client,
    url: Option<String>,
    source: String,
}

impl WebhookForwarder {
    pub fn new(config: &WebhookConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: config.url.clone(),
            source: config.source.clone(),
        }
    }

    /// Check required fields and build the outbound body.
    pub fn prepare(&self, lead: &SignupLead) -> Result<RelayPayload, WebhookError> {
        let (Some(full_name), Some(email), Some(whatsapp)) = (
            non_blank(&lead.full_name),
            non_blank(&lead.email),
            non_blank(&lead.whatsapp),
        ) else {
            return Err(WebhookError::MissingFields);
        };

        Ok(RelayPayload {
            full_name: full_name.to_string(),
            email: email.to_string(),
            whatsapp: whatsapp.to_string(),
            city: non_blank(&lead.city).map(str::to_string),
            state: non_blank(&lead.state).map(str::to_string),
            source: self.source.clone(),
            submitted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    /// Validate, then relay in the background. Relay errors never reach the caller.
    pub fn forward_signup(&self, lead: &SignupLead) -> Result<JoinHandle<()>, WebhookError> {
        let payload = self.prepare(lead)?;
        let forwarder = self.clone();
        let span = tracing::info_span!(
            "webhook_relay",
            source = %payload.source,
            email_domain = email_domain(&payload.email)
        );

        Ok(tokio::spawn(
            async move {
                match forwarder.relay(&payload).await {
                    Ok(true) => {
                        metrics::record_webhook_relay("sent");
                        tracing::info!("Signup relayed to automation webhook");
                    }
                    Ok(false) => {
                        metrics::record_webhook_relay("skipped");
                        tracing::warn!("Webhook URL not configured, signup not relayed");
                    }
                    Err(e) => {
                        metrics::record_webhook_relay("failed");
                        tracing::error!(error = %e, "Signup relay failed");
                    }
                }
            }
            .instrument(span),
        ))
    }

    /// POST the payload. `Ok(false)` when no URL is configured.
    async fn relay(&self, payload: &RelayPayload) -> Result<bool, WebhookError> {
        let Some(url) = self.url.as_deref() else {
            return Ok(false);
        };

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;

        let status = response.status();
        metrics::record_upstream_call("webhook", status.is_success());
        if status.is_success() {
            Ok(true)
        } else {
            Err(WebhookError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> SignupLead {
        SignupLead {
            full_name: Some("Ana Souza".into()),
            email: Some("ana@example.com".into()),
            whatsapp: Some("11999990000".into()),
            city: Some(" ".into()),
            state: Some("SP".into()),
        }
    }

    fn forwarder(url: Option<&str>) -> WebhookForwarder {
        let config = WebhookConfig {
            url: url.map(str::to_string),
            ..Default::default()
        };
        WebhookForwarder::new(&config, reqwest::Client::new())
    }

    #[test]
    fn test_required_fields() {
        let f = forwarder(None);
        let cases: [fn(&mut SignupLead); 3] = [
            |l| l.full_name = None,
            |l| l.email = Some("  ".into()),
            |l| l.whatsapp = None,
        ];
        for strip in cases {
            let mut l = lead();
            strip(&mut l);
            assert_eq!(f.prepare(&l), Err(WebhookError::MissingFields));
        }
    }

    #[test]
    fn test_payload_adds_source_and_drops_blank_optionals() {
        let payload = forwarder(None).prepare(&lead()).unwrap();
        assert_eq!(payload.source, "indique_e_ganhe");
        assert_eq!(payload.city, None);
        assert_eq!(payload.state.as_deref(), Some("SP"));
        assert!(payload.submitted_at.ends_with('Z'));
    }

    #[test]
    fn test_relay_span_keeps_only_email_domain() {
        assert_eq!(email_domain("ana.souza+promo@example.com.br"), "example.com.br");
        assert_eq!(email_domain("a@b@corp.example"), "corp.example");
        assert_eq!(email_domain("no-at-sign"), "");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_swallowed() {
        let handle = forwarder(Some("http://127.0.0.1:9/hook")).forward_signup(&lead()).unwrap();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_url_skips_relay() {
        let f = forwarder(None);
        let payload = f.prepare(&lead()).unwrap();
        assert_eq!(f.relay(&payload).await, Ok(false));
    }
}
