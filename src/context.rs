//! Application context: every long-lived handle the handlers need.
//!
//! # Design Decisions
//! - Built once at startup from validated configuration, then shared
//!   read-only behind `AppState`
//! - Store and push backends are trait objects so tests can swap in
//!   `MemoryStore` and scripted gateways through [`AppContext::assemble`]

use std::sync::Arc;

use crate::admin::UserProvisioner;
use crate::config::AppConfig;
use crate::push::{PushDispatcher, PushError, PushGateway, WebPushGateway};
use crate::resilience::build_http_client;
use crate::security::{AbuseTracker, CaptchaVerifier};
use crate::store::{RestStore, Stores};
use crate::viability::ViabilityClient;
use crate::webhook::WebhookForwarder;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("push gateway: {0}")]
    Push(#[from] PushError),
}

pub struct AppContext {
    pub config: AppConfig,
    pub stores: Stores,
    pub abuse: AbuseTracker,
    pub captcha: CaptchaVerifier,
    pub viability: ViabilityClient,
    /// `None` when VAPID keys are not configured.
    pub push: Option<PushDispatcher>,
    pub provisioner: UserProvisioner,
    pub webhook: WebhookForwarder,
}

impl AppContext {
    /// Production wiring: REST stores for both projects and Web Push delivery.
    pub fn from_config(config: AppConfig) -> Result<Self, ContextError> {
        let client = build_http_client(&config.timeouts)?;

        let stores = Stores {
            nio_afiliados: Arc::new(RestStore::new("nio_afiliados", &config.stores.nio_afiliados, client.clone())),
            painel_ura: Arc::new(RestStore::new("painel_ura", &config.stores.painel_ura, client.clone())),
        };

        let push_gateway = WebPushGateway::from_config(&config.push, client.clone())?
            .map(|gateway| Arc::new(gateway) as Arc<dyn PushGateway>);
        if push_gateway.is_none() {
            tracing::warn!("VAPID keys not configured; push notifications disabled");
        }

        Ok(Self::assemble(config, stores, client, push_gateway))
    }

    /// Wire services from already-built backends.
    pub fn assemble(
        config: AppConfig,
        stores: Stores,
        client: reqwest::Client,
        push_gateway: Option<Arc<dyn PushGateway>>,
    ) -> Self {
        let nio = stores.nio_afiliados.clone();

        Self {
            abuse: AbuseTracker::new(nio.clone(), config.abuse.clone()),
            captcha: CaptchaVerifier::new(&config.captcha, client.clone()),
            viability: ViabilityClient::new(&config.viability, client.clone()),
            push: push_gateway.map(|gateway| PushDispatcher::new(nio.clone(), gateway, &config.push)),
            provisioner: UserProvisioner::new(nio),
            webhook: WebhookForwarder::new(&config.webhook, client),
            stores,
            config,
        }
    }
}
