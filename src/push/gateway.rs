//! Push delivery gateway.
//!
//! # Responsibilities
//! - Encrypt the payload for one subscription and sign it with VAPID
//! - POST it to the subscription endpoint
//! - Report the provider's status code on rejection
//!
//! # Design Decisions
//! - `web-push` builds the message; `reqwest` sends it so the raw status
//!   code stays visible to the dispatcher
//! - 404 and 410 mean the subscription is gone for good

use async_trait::async_trait;
use web_push::{
    ContentEncoding, PartialVapidSignatureBuilder, SubscriptionInfo, VapidSignatureBuilder,
    WebPushMessageBuilder,
};

use crate::config::PushConfig;
use crate::push::PushSubscription;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push provider rejected delivery with status {status}")]
    Rejected { status: u16, body: String },
    #[error("push provider unreachable: {0}")]
    Transport(String),
    #[error("could not build push message: {0}")]
    Build(String),
    #[error("invalid VAPID configuration: {0}")]
    InvalidVapid(String),
}

impl PushError {
    /// Whether the provider says the subscription no longer exists.
    pub fn is_gone(&self) -> bool {
        matches!(self, PushError::Rejected { status: 404 | 410, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PushError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Delivers one encrypted payload to one subscription.
#[async_trait]
pub trait PushGateway: Send + Sync + 'static {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError>;
}

/// Web Push (RFC 8030) gateway with VAPID authentication.
pub struct WebPushGateway {
    client: reqwest::Client,
    subject: String,
    vapid: PartialVapidSignatureBuilder,
    ttl_secs: u32,
}

impl std::fmt::Debug for WebPushGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPushGateway")
            .field("subject", &self.subject)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Keys are compared without padding; providers hand them out both ways.
fn strip_padding(key: &str) -> &str {
    key.trim().trim_end_matches('=')
}

impl WebPushGateway {
    /// `Ok(None)` unless all VAPID values are configured.
    ///
    /// The private key is decoded once here, and the configured public key
    /// must be the one derived from it.
    pub fn from_config(config: &PushConfig, client: reqwest::Client) -> Result<Option<Self>, PushError> {
        let (Some(subject), Some(public_key), Some(private_key)) = (
            config.vapid_subject.as_deref(),
            config.vapid_public_key.as_deref(),
            config.vapid_private_key.as_deref(),
        ) else {
            return Ok(None);
        };

        let vapid = VapidSignatureBuilder::from_base64_no_sub(strip_padding(private_key), base64::URL_SAFE_NO_PAD)
            .map_err(|e| PushError::InvalidVapid(format!("private key: {e}")))?;

        let derived = base64::encode_config(vapid.get_public_key(), base64::URL_SAFE_NO_PAD);
        if derived != strip_padding(public_key) {
            return Err(PushError::InvalidVapid(
                "public key does not match the private key".to_string(),
            ));
        }

        Ok(Some(Self {
            client,
            subject: subject.to_string(),
            vapid,
            ttl_secs: config.ttl_secs,
        }))
    }
}

#[async_trait]
impl PushGateway for WebPushGateway {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.keys.p256dh.clone(),
            subscription.keys.auth.clone(),
        );

        let mut signature = self.vapid.clone().add_sub_info(&info);
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature.build().map_err(|e| PushError::Build(e.to_string()))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_ttl(self.ttl_secs);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(|e| PushError::Build(e.to_string()))?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(payload) = message.payload {
            request = request
                .header("Content-Encoding", payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");
            for (name, value) in payload.crypto_headers {
                request = request.header(name, value);
            }
            request = request.body(payload.content);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PushError::Rejected { status: status.as_u16(), body })
        }
    }
}
