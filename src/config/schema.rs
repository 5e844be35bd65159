//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the backend.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the platform backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound and outbound calls.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening settings.
    pub security: SecurityConfig,

    /// Admin API protection.
    pub admin: AdminConfig,

    /// Connection credentials for both backend projects.
    pub stores: StoresConfig,

    pub captcha: CaptchaConfig,

    pub abuse: AbuseConfig,

    pub viability: ViabilityConfig,

    pub push: PushConfig,

    pub webhook: WebhookConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one outbound call in seconds.
    pub upstream_secs: u64,

    /// Inbound request timeout (whole handler) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 10,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Answer CORS preflights for any origin.
    pub permissive_cors: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
            permissive_cors: true,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// API key for authentication (Bearer token). Empty rejects every admin call.
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoresConfig {
    /// Referral programme project (indique e ganhe).
    pub nio_afiliados: StoreConfig,
    /// URA dashboard project (sistema URA).
    pub painel_ura: StoreConfig,
}

/// Credentials for one backend-as-a-service project.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Project base URL (e.g., "https://xyz.supabase.co").
    pub url: String,
    /// Service role key, sent as both `apikey` and bearer token.
    pub service_role_key: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Provider secret. Requests fail with 500 while this is unset.
    pub secret_key: Option<String>,
    pub verify_url: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
        }
    }
}

/// Attempt limits for one action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActionLimits {
    pub max_attempts: u32,
    pub window_minutes: i64,
    pub block_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AbuseLimitsConfig {
    pub signup: ActionLimits,
    pub login: ActionLimits,
    pub default: ActionLimits,
}

impl Default for AbuseLimitsConfig {
    fn default() -> Self {
        Self {
            signup: ActionLimits { max_attempts: 5, window_minutes: 60, block_minutes: 30 },
            login: ActionLimits { max_attempts: 10, window_minutes: 15, block_minutes: 15 },
            default: ActionLimits { max_attempts: 20, window_minutes: 60, block_minutes: 60 },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AbuseConfig {
    pub limits: AbuseLimitsConfig,

    /// Restart the counter once the last attempt falls outside the window
    /// or a previous block has lapsed.
    pub reset_after_window: bool,

    /// Compare-and-swap rounds before giving up on a contended record.
    pub max_write_attempts: u32,

    /// Base delay for the jittered backoff between rounds in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between rounds in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            limits: AbuseLimitsConfig::default(),
            reset_after_window: true,
            max_write_attempts: 5,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViabilityConfig {
    /// Lookup endpoint; `uf` and `cep` are appended as query parameters.
    pub base_url: String,
}

impl Default for ViabilityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://168.121.7.194:9011/api1/viabilidade/checar-cep/".to_string(),
        }
    }
}

/// Web Push (VAPID) configuration. Push delivery stays disabled until all
/// three VAPID values are present.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PushConfig {
    pub vapid_subject: Option<String>,
    pub vapid_public_key: Option<String>,
    /// URL-safe base64 of the raw P-256 private key.
    pub vapid_private_key: Option<String>,
    pub icon: String,
    pub badge: String,
    /// Time the provider keeps an undelivered message, in seconds.
    pub ttl_secs: u32,
}

impl PushConfig {
    pub fn is_configured(&self) -> bool {
        self.vapid_subject.is_some()
            && self.vapid_public_key.is_some()
            && self.vapid_private_key.is_some()
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_subject: None,
            vapid_public_key: None,
            vapid_private_key: None,
            icon: "/favicon.ico".to_string(),
            badge: "/favicon.ico".to_string(),
            ttl_secs: 24 * 3600,
        }
    }
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("vapid_subject", &self.vapid_subject)
            .field("vapid_public_key", &self.vapid_public_key)
            .field("vapid_private_key", &self.vapid_private_key.as_ref().map(|_| "<redacted>"))
            .field("icon", &self.icon)
            .field("badge", &self.badge)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Automation endpoint receiving new referrers. Unset skips the relay.
    pub url: Option<String>,
    /// Value of the `source` field added to every relayed payload.
    pub source: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            source: "indique_e_ganhe".to_string(),
        }
    }
}
